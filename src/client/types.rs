//! Type definitions for the Splitwise API.
//!
//! This module contains the request payloads the client encodes into query strings and the
//! response types it unwraps from Splitwise's JSON bodies.
//!
//! ## Key Types
//!
//! - [`Expense`] - An expense with its per-user shares and repayments
//! - [`Group`] - A group with its members and debts
//! - [`User`] / [`Friend`] - Account details and friend balances
//! - [`UserShare`] - How much each user paid and owes when creating an expense
//! - [`GroupMember`] - An existing user (by id) or a new member invited by email
//!
//! ## API Compatibility
//!
//! Splitwise responses carry many fields that are undocumented or only present for some
//! accounts. Almost everything beyond ids is therefore optional, and unknown fields are ignored.
//! Monetary amounts are kept as the decimal strings Splitwise sends (e.g. `"25.0"`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Profile picture URLs in the sizes Splitwise serves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Picture {
    /// 50px by 50px
    #[serde(default)]
    pub small: Option<String>,
    /// 100px by 100px
    #[serde(default)]
    pub medium: Option<String>,
    /// 200px by 200px
    #[serde(default)]
    pub large: Option<String>,
}

/// A Splitwise user, as returned by `get_current_user`, `get_user` and group member lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// One of "dummy", "invited" and "confirmed"
    #[serde(default)]
    pub registration_status: Option<String>,
    #[serde(default)]
    pub picture: Option<Picture>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub date_format: Option<String>,
    #[serde(default)]
    pub default_currency: Option<String>,
    #[serde(default)]
    pub default_group_id: Option<i64>,
    #[serde(default)]
    pub notifications_read: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notifications_count: Option<i64>,
    /// Per-event notification preferences (only present for the current user)
    #[serde(default)]
    pub notifications: Option<serde_json::Value>,
    /// Member balances (only present inside a group)
    #[serde(default)]
    pub balance: Vec<Balance>,
}

/// An outstanding amount in one currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    pub currency_code: String,
    pub amount: String,
}

/// A friend of the current user, with balances overall and per group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friend {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub registration_status: Option<String>,
    #[serde(default)]
    pub picture: Option<Picture>,
    #[serde(default)]
    pub balance: Vec<Balance>,
    #[serde(default)]
    pub groups: Vec<FriendGroup>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The balance with a friend inside one group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendGroup {
    pub group_id: i64,
    #[serde(default)]
    pub balance: Vec<Balance>,
}

/// A debt between two users of a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debt {
    /// User id of the debtor
    pub from: i64,
    /// User id of the creditor
    pub to: i64,
    pub amount: String,
    #[serde(default)]
    pub currency_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub members: Vec<User>,
    #[serde(default)]
    pub simplify_by_default: Option<bool>,
    #[serde(default)]
    pub original_debts: Vec<Debt>,
    #[serde(default)]
    pub simplified_debts: Vec<Debt>,
    #[serde(default)]
    pub whiteboard: Option<String>,
    /// e.g. "apartment", "house", "trip", "other"
    #[serde(default)]
    pub group_type: Option<String>,
    #[serde(default)]
    pub invite_link: Option<String>,
}

/// A currency supported by Splitwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Currency {
    /// e.g. "GBP"
    pub currency_code: String,
    /// e.g. "£"
    pub unit: String,
}

/// An expense category; top-level categories carry their subcategories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub icon_types: Option<serde_json::Value>,
    #[serde(default)]
    pub subcategories: Vec<Category>,
}

/// The category reference embedded in an expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseCategory {
    pub id: i64,
    pub name: String,
}

/// Minimal user data embedded in expenses and comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBasic {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub picture: Option<Picture>,
}

/// One user's involvement in an expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseUser {
    #[serde(default)]
    pub user: Option<UserBasic>,
    pub user_id: i64,
    #[serde(default)]
    pub paid_share: Option<String>,
    #[serde(default)]
    pub owed_share: Option<String>,
    #[serde(default)]
    pub net_balance: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repayment {
    pub from: i64,
    pub to: i64,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub friendship_id: Option<i64>,
    #[serde(default)]
    pub expense_bundle_id: Option<i64>,
    pub description: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub payment: Option<bool>,
    #[serde(default)]
    pub repeats: Option<bool>,
    /// "never", "weekly", "fortnightly", "monthly" or "yearly"
    #[serde(default)]
    pub repeat_interval: Option<String>,
    /// Total cost as a decimal string, e.g. "25.0"
    pub cost: String,
    #[serde(default)]
    pub currency_code: Option<String>,
    /// "equal", "iou", "quickadd", "payment" or "split"
    #[serde(default)]
    pub creation_method: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: Option<UserBasic>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_by: Option<UserBasic>,
    /// Set once the expense has been deleted
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted_by: Option<UserBasic>,
    #[serde(default)]
    pub category: Option<ExpenseCategory>,
    #[serde(default)]
    pub comments_count: Option<i64>,
    #[serde(default)]
    pub repayments: Vec<Repayment>,
    #[serde(default)]
    pub users: Vec<ExpenseUser>,
}

impl Expense {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    /// Numeric notification type as documented by Splitwise
    #[serde(rename = "type")]
    pub type_: i64,
    /// HTML-formatted notification text
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: Option<i64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_shape: Option<String>,
    #[serde(default)]
    pub source: Option<serde_json::Value>,
}

/// Result of asking Splitwise to interpret a natural-language sentence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedSentence {
    #[serde(default)]
    pub expense: Option<Expense>,
    #[serde(default)]
    pub valid: Option<bool>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Filters for `get_expenses`. Unset fields are left out of the query.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExpensesQuery {
    pub group_id: Option<i64>,
    pub friendship_id: Option<i64>,
    pub dated_after: Option<DateTime<Utc>>,
    pub dated_before: Option<DateTime<Utc>>,
    pub updated_after: Option<DateTime<Utc>>,
    pub updated_before: Option<DateTime<Utc>>,
    /// Defaults to 20 on the server; 0 fetches everything
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Fields of a new expense. Shares are passed separately as [`UserShare`]s.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateExpenseRequest {
    pub payment: bool,
    /// Decimal string, e.g. "9.99"
    pub cost: String,
    pub description: String,
    pub group_id: Option<i64>,
    pub friendship_id: Option<i64>,
    pub details: Option<String>,
    /// "iou", "quickadd", "payment" or "split"
    pub creation_method: Option<String>,
    pub date: Option<DateTime<Utc>>,
    /// "never", "weekly", "fortnightly", "monthly" or "yearly"
    pub repeat_interval: Option<String>,
    pub currency_code: Option<String>,
    pub category_id: Option<i64>,
}

/// How much one user paid towards, and owes for, an expense.
#[derive(Debug, Clone, Serialize)]
pub struct UserShare {
    pub user_id: i64,
    pub paid_share: String,
    pub owed_share: String,
}

impl UserShare {
    pub fn new(user_id: i64, paid_share: impl Into<String>, owed_share: impl Into<String>) -> Self {
        Self {
            user_id,
            paid_share: paid_share.into(),
            owed_share: owed_share.into(),
        }
    }
}

/// A group member: either an existing user or someone invited by email.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum GroupMember {
    Existing {
        user_id: i64,
    },
    Invite {
        first_name: String,
        last_name: Option<String>,
        email: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct CreateGroupRequest {
    pub name: String,
    /// e.g. "apartment", "house", "trip", "other"
    pub group_type: Option<String>,
    pub country_code: Option<String>,
    /// The current user is added by Splitwise automatically
    pub members: Vec<GroupMember>,
}

/// A user to befriend, identified by email.
#[derive(Debug, Clone, Serialize)]
pub struct NewFriend {
    pub user_email: String,
    pub user_first_name: String,
    pub user_last_name: Option<String>,
}
