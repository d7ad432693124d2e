//! Order-creation hook.
//!
//! Only checks whether the order's owner can receive pushes and logs the
//! result. It never classifies deadlines or sends anything; the periodic
//! sweep handles notifications.

use tracing::{info, warn};

use duewatch_storage::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderCreatedOutcome {
    TokenPresent,
    NoToken,
    UserMissing,
    StoreFailed,
}

pub async fn on_order_created(
    store: &dyn Store,
    user_id: &str,
    order_id: &str,
) -> OrderCreatedOutcome {
    let user = match store.get_user(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!(user_id, order_id, "Order created for unknown user");
            return OrderCreatedOutcome::UserMissing;
        }
        Err(e) => {
            warn!(user_id, order_id, error = %e, "Failed to load user for new order");
            return OrderCreatedOutcome::StoreFailed;
        }
    };

    if user.push_token().is_some() {
        info!(user_id, order_id, "New order; user has a push token");
        OrderCreatedOutcome::TokenPresent
    } else {
        info!(user_id, order_id, "New order; user has no push token");
        OrderCreatedOutcome::NoToken
    }
}
