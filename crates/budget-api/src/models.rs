//! Backend resource models
//!
//! Field names follow the backend's camelCase JSON. Optional descriptive
//! fields default when absent because list and detail routes do not always
//! return the same shape.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use budget_auth::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Income,
    Expense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CategoryType {
    Income,
    Expense,
    Transfer,
    Savings,
    Investment,
    Debt,
}

/// List ordering. Serialized as `ASC`/`DESC`; accepts either case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[serde(rename = "ASC", alias = "asc")]
    Asc,
    #[serde(rename = "DESC", alias = "desc")]
    Desc,
}

impl SortOrder {
    pub fn as_lowercase(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Category as embedded in a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCategory {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<TransactionType>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub name: String,
    pub amount: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default)]
    pub transaction_category: Option<TransactionCategory>,
    pub transaction_date: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// `POST /transactions` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPayload {
    pub name: String,
    pub description: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub date: String,
    pub category_id: i64,
}

/// `PUT /transactions/{id}` body; only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
}

/// Query parameters for `GET /transactions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilters {
    pub keyword: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    pub sort_by: Option<String>,
    pub order_by: Option<SortOrder>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<u32>,
    pub page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: CategoryType,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// `POST /categories` and `PUT /categories/{id}` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPayload {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: CategoryType,
}

/// Query parameters for `GET /categories`. The categories route expects a
/// lowercase `orderBy`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFilters {
    pub keyword: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<CategoryType>,
    pub sort_by: Option<String>,
    #[serde(serialize_with = "lowercase_order")]
    pub order_by: Option<SortOrder>,
    pub limit: Option<u32>,
    pub page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: i64,
    pub name: String,
    pub goal_amount: f64,
    #[serde(default)]
    pub current_amount: f64,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub approximate_days: Option<i64>,
}

/// `POST /goals` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalPayload {
    pub name: String,
    pub goal_amount: f64,
    pub current_amount: f64,
    pub is_active: bool,
}

/// `PUT /goals/{id}` body; only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Query parameters for `GET /goals`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalFilters {
    pub keyword: Option<String>,
    pub sort_by: Option<String>,
    pub order_by: Option<SortOrder>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<u32>,
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub total_items: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub limit: u64,
}

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub list: Vec<T>,
    #[serde(default)]
    pub metadata: PageMetadata,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.metadata.current_page < self.metadata.total_pages
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }
    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

fn lowercase_order<S: Serializer>(order: &Option<SortOrder>, serializer: S) -> Result<S::Ok, S::Error> {
    match order {
        Some(order) => serializer.serialize_str(order.as_lowercase()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_decodes_backend_shape() {
        let json = r#"{
            "id": 12,
            "name": "Groceries",
            "amount": 54.3,
            "description": "weekly shop",
            "createdAt": "2026-10-01T10:00:00Z",
            "updatedAt": "2026-10-01T10:00:00Z",
            "type": "EXPENSE",
            "transactionCategory": {
                "id": 3, "name": "Food", "description": "", "type": "EXPENSE",
                "createdAt": "2026-01-01T00:00:00Z", "updatedAt": "2026-01-01T00:00:00Z"
            },
            "transactionDate": "2026-10-01"
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.kind, TransactionType::Expense);
        assert_eq!(tx.transaction_category.unwrap().name, "Food");
        assert_eq!(tx.transaction_date, "2026-10-01");
    }

    #[test]
    fn category_id_accepts_number_or_string() {
        let a: Category =
            serde_json::from_str(r#"{"id":"c1","name":"Rent","type":"EXPENSE"}"#).unwrap();
        let b: Category =
            serde_json::from_str(r#"{"id":7,"name":"Salary","type":"INCOME"}"#).unwrap();
        assert_eq!(a.id, "c1");
        assert_eq!(b.id, "7");
        assert_eq!(b.kind, CategoryType::Income);
    }

    #[test]
    fn all_category_types_round_trip_uppercase() {
        for (kind, text) in [
            (CategoryType::Transfer, "\"TRANSFER\""),
            (CategoryType::Savings, "\"SAVINGS\""),
            (CategoryType::Investment, "\"INVESTMENT\""),
            (CategoryType::Debt, "\"DEBT\""),
        ] {
            assert_eq!(serde_json::to_string(&kind).unwrap(), text);
        }
    }

    #[test]
    fn partial_update_omits_unset_fields() {
        let update = TransactionUpdate {
            amount: Some(10.0),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), serde_json::json!({"amount": 10.0}));
    }

    #[test]
    fn sort_order_casing() {
        let filters = TransactionFilters {
            order_by: Some(SortOrder::Desc),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&filters).unwrap()["orderBy"], "DESC");

        let filters = CategoryFilters {
            order_by: Some(SortOrder::Asc),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&filters).unwrap()["orderBy"], "asc");

        let parsed: SortOrder = serde_json::from_str("\"desc\"").unwrap();
        assert_eq!(parsed, SortOrder::Desc);
    }

    #[test]
    fn page_reports_next_page() {
        let page: Page<Goal> = serde_json::from_str(
            r#"{"list":[{"id":1,"name":"Car","goalAmount":5000,"currentAmount":1200,"isActive":true,"approximateDays":90}],
                "metadata":{"totalItems":11,"totalPages":2,"currentPage":1,"limit":10}}"#,
        )
        .unwrap();
        assert_eq!(page.list[0].approximate_days, Some(90));
        assert!(page.has_next());
    }
}
