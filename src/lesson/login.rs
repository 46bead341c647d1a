use std::fmt;
use std::time::Duration;

use tracing::{debug, info};

use crate::app::{HarvestError, Result};
use crate::browser::{Element, PageDriver};

pub const LOGIN_URL: &str = "https://www.skool.com/login";

const EMAIL_SELECTORS: &[&str] = &["input[type='email']", "input[name='email']", "#email"];
const PASSWORD_SELECTORS: &[&str] = &["input[type='password']", "input[name='password']", "#password"];
const SUBMIT_SELECTORS: &[&str] = &["button[type='submit']", "input[type='submit']"];

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

async fn first_match(page: &dyn PageDriver, selectors: &[&str]) -> Result<Option<Box<dyn Element>>> {
    for selector in selectors {
        if let Some(el) = page.find_elements(selector).await?.into_iter().next() {
            debug!(selector, "Login form field found");
            return Ok(Some(el));
        }
    }
    Ok(None)
}

/// Fill and submit the login form, then wait `settle` for the redirect.
///
/// Succeeds only if the browser has left the login page.
pub async fn login(page: &dyn PageDriver, credentials: &Credentials, settle: Duration) -> Result<()> {
    info!(email = %credentials.email, "Logging in");
    page.navigate(LOGIN_URL).await?;

    let email = first_match(page, EMAIL_SELECTORS)
        .await?
        .ok_or_else(|| HarvestError::Authentication("email field not found".into()))?;
    email.type_text(&credentials.email).await?;

    let password = first_match(page, PASSWORD_SELECTORS)
        .await?
        .ok_or_else(|| HarvestError::Authentication("password field not found".into()))?;
    password.type_text(&credentials.password).await?;

    let submit = first_match(page, SUBMIT_SELECTORS)
        .await?
        .ok_or_else(|| HarvestError::Authentication("submit button not found".into()))?;
    submit.click().await?;

    tokio::time::sleep(settle).await;

    let current = page.current_url().await?;
    if current.contains("login") {
        return Err(HarvestError::Authentication(format!(
            "still on login page: {current}"
        )));
    }
    info!("Login successful");
    Ok(())
}
