//! Login, registration and account commands.

use cablestore_client::Storefront;
use secrecy::SecretString;

use crate::error::CliError;
use crate::output;

pub async fn login(shop: &Storefront, email: &str, password: SecretString) -> Result<(), CliError> {
    let user = shop.session().login(email, &password).await?;
    output::line(format_args!("Logged in as {} ({})", user.display_name(), user.email));
    Ok(())
}

pub async fn register(
    shop: &Storefront,
    email: &str,
    password: SecretString,
    company: &str,
) -> Result<(), CliError> {
    let user = shop.session().register(email, &password, company).await?;
    output::line(format_args!("Registered and logged in as {}", user.email));
    Ok(())
}

/// Log out; `local` skips the server-side token revoke.
pub async fn logout(shop: &Storefront, local: bool) -> Result<(), CliError> {
    if local {
        shop.session().logout()?;
    } else {
        shop.session().revoke_and_logout().await?;
    }
    output::line("Logged out");
    Ok(())
}

pub fn whoami(shop: &Storefront) -> Result<(), CliError> {
    let session = shop.session();
    let user = session.current_user().ok_or(CliError::NotLoggedIn)?;

    output::line(format_args!("{} <{}>", user.display_name(), user.email));
    if let Some(company) = &user.company_name {
        output::line(format_args!("company: {company}"));
    }
    output::line(format_args!("role:    {}", user.role));
    if session.is_admin() {
        output::line("access:  back office");
    }
    if let Some(rate) = user.discount_rate {
        output::line(format_args!("discount: {rate}"));
    }
    Ok(())
}
