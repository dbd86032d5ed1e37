//! Print a bearer token for an admin identity.
//!
//! Usage: `issue_token [user-id] [ttl-hours]`. A random id and 24 hours are
//! used when the arguments are omitted.

use anyhow::Context;
use storefront_api::middleware::auth::{ADMIN_ROLE, issue_token};
use uuid::Uuid;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let secret = std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?;

    let mut args = std::env::args().skip(1);
    let user_id = match args.next() {
        Some(raw) => Uuid::parse_str(&raw).context("user id must be a UUID")?,
        None => Uuid::new_v4(),
    };
    let hours = match args.next() {
        Some(raw) => raw.parse::<i64>().context("ttl must be a number of hours")?,
        None => 24,
    };

    let token = issue_token(user_id, ADMIN_ROLE, &secret, chrono::Duration::hours(hours))?;
    println!("{token}");
    Ok(())
}
