//! Typed client for the budget backend
//!
//! Every call goes through the `Gateway`, so expired tokens are refreshed
//! and replayed without the caller noticing. Resource groups are borrowed
//! views (`api.transactions().list(..)`) over one shared gateway.

use budget_auth::CURRENT_USER_PATH;
use budget_gateway::{Gateway, RequestDescriptor, Result};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::models::{
    Category, CategoryFilters, CategoryPayload, Goal, GoalFilters, GoalPayload, GoalUpdate, Page,
    Transaction, TransactionFilters, TransactionPayload, TransactionUpdate, User,
};

const TRANSACTIONS_PATH: &str = "/transactions";
const CATEGORIES_PATH: &str = "/categories";
const GOALS_PATH: &str = "/goals";

/// Budget backend client.
#[derive(Clone)]
pub struct BudgetApi {
    gateway: Gateway,
}

impl BudgetApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Profile of the signed-in user.
    pub async fn me(&self) -> Result<User> {
        self.gateway
            .send_json(RequestDescriptor::get(CURRENT_USER_PATH))
            .await
    }

    pub fn transactions(&self) -> Transactions<'_> {
        Transactions {
            gateway: &self.gateway,
        }
    }

    pub fn categories(&self) -> Categories<'_> {
        Categories {
            gateway: &self.gateway,
        }
    }

    pub fn goals(&self) -> Goals<'_> {
        Goals {
            gateway: &self.gateway,
        }
    }
}

async fn list<T, F>(gateway: &Gateway, path: &str, filters: &F) -> Result<Page<T>>
where
    T: DeserializeOwned,
    F: serde::Serialize,
{
    let page: Page<T> = gateway
        .send_json(RequestDescriptor::get(path).with_query(filters)?)
        .await?;
    debug!(
        path,
        items = page.list.len(),
        total = page.metadata.total_items,
        "fetched page"
    );
    Ok(page)
}

async fn delete(gateway: &Gateway, path: String) -> Result<()> {
    gateway.send(RequestDescriptor::delete(path)).await?;
    Ok(())
}

/// `/transactions` routes.
pub struct Transactions<'a> {
    gateway: &'a Gateway,
}

impl Transactions<'_> {
    pub async fn list(&self, filters: &TransactionFilters) -> Result<Page<Transaction>> {
        list(self.gateway, TRANSACTIONS_PATH, filters).await
    }

    pub async fn get(&self, id: i64) -> Result<Transaction> {
        self.gateway
            .send_json(RequestDescriptor::get(format!("{TRANSACTIONS_PATH}/{id}")))
            .await
    }

    pub async fn create(&self, payload: &TransactionPayload) -> Result<Transaction> {
        self.gateway
            .send_json(RequestDescriptor::post(TRANSACTIONS_PATH).with_json(payload)?)
            .await
    }

    pub async fn update(&self, id: i64, update: &TransactionUpdate) -> Result<Transaction> {
        self.gateway
            .send_json(RequestDescriptor::put(format!("{TRANSACTIONS_PATH}/{id}")).with_json(update)?)
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        delete(self.gateway, format!("{TRANSACTIONS_PATH}/{id}")).await
    }
}

/// `/categories` routes.
pub struct Categories<'a> {
    gateway: &'a Gateway,
}

impl Categories<'_> {
    pub async fn list(&self, filters: &CategoryFilters) -> Result<Page<Category>> {
        list(self.gateway, CATEGORIES_PATH, filters).await
    }

    pub async fn create(&self, payload: &CategoryPayload) -> Result<Category> {
        self.gateway
            .send_json(RequestDescriptor::post(CATEGORIES_PATH).with_json(payload)?)
            .await
    }

    pub async fn update(&self, id: &str, payload: &CategoryPayload) -> Result<Category> {
        self.gateway
            .send_json(RequestDescriptor::put(format!("{CATEGORIES_PATH}/{id}")).with_json(payload)?)
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        delete(self.gateway, format!("{CATEGORIES_PATH}/{id}")).await
    }
}

/// `/goals` routes.
pub struct Goals<'a> {
    gateway: &'a Gateway,
}

impl Goals<'_> {
    pub async fn list(&self, filters: &GoalFilters) -> Result<Page<Goal>> {
        list(self.gateway, GOALS_PATH, filters).await
    }

    pub async fn get(&self, id: i64) -> Result<Goal> {
        self.gateway
            .send_json(RequestDescriptor::get(format!("{GOALS_PATH}/{id}")))
            .await
    }

    pub async fn create(&self, payload: &GoalPayload) -> Result<Goal> {
        self.gateway
            .send_json(RequestDescriptor::post(GOALS_PATH).with_json(payload)?)
            .await
    }

    pub async fn update(&self, id: i64, update: &GoalUpdate) -> Result<Goal> {
        self.gateway
            .send_json(RequestDescriptor::put(format!("{GOALS_PATH}/{id}")).with_json(update)?)
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        delete(self.gateway, format!("{GOALS_PATH}/{id}")).await
    }
}
