use crate::{
    client::{read_json, ApiClient, ApiError},
    identity::{self, LoginResponse, MissingToken, RawLoginResponse},
    types::{Credentials, Registration},
    User,
};
use reqwest::Method;
use std::convert::TryFrom;

/// Exchange an email and password for a [`LoginResponse`].
///
/// This doesn't touch the session, see [`login_and_store()`] for that.
pub async fn login(
    client: &ApiClient,
    email: &str,
    password: &str,
) -> Result<LoginResponse, LoginError> {
    let credentials = Credentials { email, password };

    let response = client
        .send_json(Method::POST, "/auth/login", &credentials)
        .await?;
    let raw: RawLoginResponse = read_json(response).await?;

    LoginResponse::try_from(raw).map_err(LoginError::from)
}

/// Log in and record the resulting session, returning who we logged in as.
///
/// When the backend leaves the user out of its response, one is pieced
/// together from the token's claims and the email used to log in.
pub async fn login_and_store(
    client: &ApiClient,
    email: &str,
    password: &str,
) -> Result<User, LoginError> {
    let session = client.session();
    session.set_loading(true);

    let outcome = login(client, email, password).await;
    session.set_loading(false);

    let (token, user) = identity::resolve_identity(outcome?, email);
    session.set_auth(token, user.clone());

    Ok(user)
}

/// Create a new account. This never logs the new user in.
pub async fn register(
    client: &ApiClient,
    registration: &Registration,
) -> Result<(), ApiError> {
    client
        .send_json(Method::POST, "/auth/register", registration)
        .await?;
    log::info!("Registered {}", registration.email);

    Ok(())
}

/// Possible errors that may be returned by [`login()`].
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("Unable to log in")]
    Api(#[from] ApiError),
    #[error(transparent)]
    MissingToken(#[from] MissingToken),
}

impl LoginError {
    /// The message the backend gave for rejecting the login, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            LoginError::Api(e) => e.server_message(),
            LoginError::MissingToken(_) => None,
        }
    }

    /// What to tell the user. Credentials rejected without an explanation
    /// are reported as a bad email or password.
    pub fn user_message(&self) -> String {
        if let Some(message) = self.server_message() {
            return message.to_string();
        }

        match self {
            LoginError::Api(e) if e.is_unauthorized() => {
                String::from("Invalid email or password")
            },
            LoginError::Api(e) => e.to_string(),
            LoginError::MissingToken(e) => e.to_string(),
        }
    }
}
