use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::{
    auth::{OAuthConsumer, OAuthSigner, OAuthToken},
    error::{has_errors, ApiError},
    types::*,
    API_PATH, REQUEST_TIMEOUT,
};
use crate::encoding::{encode_object_array, ParamMap};

const USER_KEYS: &[&str] = &[
    "first_name",
    "last_name",
    "email",
    "password",
    "locale",
    "date_format",
    "default_currency",
    "default_group_id",
];

const EXPENSE_UPDATE_KEYS: &[&str] = &[
    "group_id",
    "friendship_id",
    "expense_bundle_id",
    "description",
    "details",
    "payment",
    "cost",
    "date",
    "category_id",
    "users",
];

/// A Splitwise client acting on behalf of one user.
pub struct SplitwiseClient {
    base_url: String,
    client: Client,
    signer: OAuthSigner,
    access_token: OAuthToken,
    timeout: Duration,
}

impl SplitwiseClient {
    pub fn new(base_url: String, consumer: OAuthConsumer, access_token: OAuthToken) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            signer: OAuthSigner::new(consumer, Some(access_token.clone())),
            access_token,
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Overrides the per-request timeout (10 seconds by default).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn get_token_preview(&self) -> String {
        self.access_token.preview()
    }

    pub fn access_token(&self) -> &OAuthToken {
        &self.access_token
    }

    fn endpoint_url(&self, endpoint: &str, params: Option<&ParamMap>) -> String {
        let mut url = format!("{}{}/{}", self.base_url, API_PATH, endpoint);
        if let Some(params) = params {
            let query = params.encode();
            if !query.is_empty() {
                url.push('?');
                url.push_str(&query);
            }
        }
        url
    }

    /// Signs and sends one request, returning the parsed JSON body.
    async fn request(&self, method: Method, endpoint: &str, params: Option<&ParamMap>) -> Result<Value> {
        let url = self.endpoint_url(endpoint, params);
        let auth_header = self.signer.authorization_header(&method, &url, &[])?;

        tracing::debug!("{} {} (token {})", method, url, self.access_token.preview());

        let response = self
            .client
            .request(method.clone(), &url)
            .header("Authorization", auth_header)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Network error calling {}: {}", endpoint, e);
                anyhow::Error::new(e).context(format!("Failed to reach Splitwise API ({})", endpoint))
            })?;

        let status = response.status();
        tracing::debug!("{} response status: {}", endpoint, status);

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {}", endpoint))?;

        if !status.is_success() {
            tracing::error!("{} failed with status {}: {}", endpoint, status, body);
            return Err(ApiError::from_status(status.as_u16(), &body).into());
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse {} response: {}", endpoint, e);
            ApiError::MalformedResponse(format!("{} returned invalid JSON: {}", endpoint, e)).into()
        })
    }

    async fn get(&self, endpoint: &str, params: Option<&ParamMap>) -> Result<Value> {
        self.request(Method::GET, endpoint, params).await
    }

    async fn post(&self, endpoint: &str, params: Option<&ParamMap>) -> Result<Value> {
        self.request(Method::POST, endpoint, params).await
    }

    // Service operations
    /// A service health-check; any failure counts as "not ok".
    pub async fn is_service_ok(&self) -> bool {
        match self.get("test", None).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Splitwise health check failed: {}", e);
                false
            }
        }
    }

    pub async fn get_currencies(&self) -> Result<Vec<Currency>> {
        let body = self.get("get_currencies", None).await?;
        take_field(body, "currencies")
    }

    pub async fn get_categories(&self) -> Result<Vec<Category>> {
        let body = self.get("get_categories", None).await?;
        take_field(body, "categories")
    }

    /// Asks Splitwise to turn a sentence such as "I owe Bob 5 for lunch" into an expense.
    pub async fn parse_sentence(
        &self,
        input: &str,
        friend_id: Option<i64>,
        autosave: bool,
    ) -> Result<ParsedSentence> {
        let params = ParamMap::new()
            .with("input", input)
            .with("friend_id", friend_id)
            .with("autosave", autosave.then_some(true));

        let body = self.post("parse_sentence", Some(&params)).await?;
        serde_json::from_value(body)
            .map_err(|e| ApiError::MalformedResponse(format!("parse_sentence: {}", e)).into())
    }

    // User operations
    pub async fn get_current_user(&self) -> Result<User> {
        let body = self.get("get_current_user", None).await?;
        take_field(body, "user")
    }

    pub async fn get_user(&self, user_id: i64) -> Result<User> {
        let body = self.get(&format!("get_user/{}", user_id), None).await?;
        take_field(body, "user")
    }

    /// Updates a user. Only the profile keys Splitwise allows editing are accepted.
    pub async fn update_user(&self, user_id: i64, params: &ParamMap) -> Result<User> {
        params.ensure_keys(USER_KEYS)?;

        let body = self
            .request(Method::PUT, &format!("update_user/{}", user_id), Some(params))
            .await?;
        take_field(body, "user")
    }

    // Group operations
    pub async fn get_groups(&self) -> Result<Vec<Group>> {
        let body = self.get("get_groups", None).await?;
        take_field(body, "groups")
    }

    pub async fn get_group(&self, group_id: i64) -> Result<Group> {
        let body = self.get(&format!("get_group/{}", group_id), None).await?;
        take_field(body, "group")
    }

    /// Creates a group; the current user is always a member.
    pub async fn create_group(&self, request: &CreateGroupRequest) -> Result<Group> {
        if request.name.trim().is_empty() {
            return Err(ApiError::Validation("group name can't be blank".to_string()).into());
        }

        let members = request
            .members
            .iter()
            .map(ParamMap::from_serialize)
            .collect::<Result<Vec<_>, _>>()?;

        let params = ParamMap::new()
            .with("name", &request.name)
            .with("group_type", request.group_type.clone())
            .with("country_code", request.country_code.clone())
            .with("members", encode_object_array("users", &members));

        let body = self.post("create_group", Some(&params)).await?;
        let group: Value = take_field(body, "group")?;
        if has_errors(group.get("errors")) {
            return Err(ApiError::Rejected {
                errors: group["errors"].clone(),
            }
            .into());
        }

        serde_json::from_value(group)
            .map_err(|e| ApiError::MalformedResponse(format!("create_group: {}", e)).into())
    }

    pub async fn delete_group(&self, group_id: i64) -> Result<bool> {
        let body = self.post(&format!("delete_group/{}", group_id), None).await?;
        take_field(body, "success")
    }

    /// Adds an existing user, or invites someone new, to a group.
    pub async fn add_user_to_group(&self, group_id: i64, member: &GroupMember) -> Result<User> {
        let mut params = ParamMap::new().with("group_id", group_id);
        params.merge(ParamMap::from_serialize(member)?);

        let body = self.post("add_user_to_group", Some(&params)).await?;
        ensure_success(&body)?;
        take_field(body, "user")
    }

    /// Removes a user from a group. Splitwise refuses unless their balance is zero.
    pub async fn remove_user_from_group(&self, group_id: i64, user_id: i64) -> Result<bool> {
        let params = ParamMap::new()
            .with("group_id", group_id)
            .with("user_id", user_id);

        let body = self.post("remove_user_from_group", Some(&params)).await?;
        ensure_success(&body)?;
        Ok(true)
    }

    // Expense operations
    /// Expenses involving the current user, newest first, excluding deleted ones.
    pub async fn get_expenses(&self, query: Option<&ExpensesQuery>) -> Result<Vec<Expense>> {
        let expenses = self.fetch_expenses(query).await?;
        Ok(expenses.into_iter().filter(|e| !e.is_deleted()).collect())
    }

    /// Deleted expenses involving the current user; filters as for [`get_expenses`](Self::get_expenses).
    pub async fn get_deleted_expenses(&self, query: Option<&ExpensesQuery>) -> Result<Vec<Expense>> {
        let expenses = self.fetch_expenses(query).await?;
        Ok(expenses.into_iter().filter(Expense::is_deleted).collect())
    }

    async fn fetch_expenses(&self, query: Option<&ExpensesQuery>) -> Result<Vec<Expense>> {
        let params = query.map(ParamMap::from_serialize).transpose()?;
        let body = self.get("get_expenses", params.as_ref()).await?;
        take_field(body, "expenses")
    }

    pub async fn get_expense(&self, expense_id: i64) -> Result<Expense> {
        let body = self.get(&format!("get_expense/{}", expense_id), None).await?;
        take_field(body, "expense")
    }

    /// Creates an expense split between `shares`; Splitwise returns the created expense(s).
    pub async fn create_expense(
        &self,
        expense: &CreateExpenseRequest,
        shares: &[UserShare],
    ) -> Result<Vec<Expense>> {
        let shares = shares
            .iter()
            .map(ParamMap::from_serialize)
            .collect::<Result<Vec<_>, _>>()?;

        let mut params = ParamMap::from_serialize(expense)?;
        params.insert("users", encode_object_array("users", &shares));

        let body = self.post("create_expense", Some(&params)).await?;
        ensure_no_errors(&body)?;
        take_field(body, "expenses")
    }

    /// Edits an expense. A `users` entry, if given, should hold fragments from
    /// [`encode_object_array`] with the `users` prefix.
    pub async fn update_expense(&self, expense_id: i64, params: &ParamMap) -> Result<Vec<Expense>> {
        params.ensure_keys(EXPENSE_UPDATE_KEYS)?;

        let body = self
            .post(&format!("update_expense/{}", expense_id), Some(params))
            .await?;
        ensure_no_errors(&body)?;
        take_field(body, "expenses")
    }

    pub async fn delete_expense(&self, expense_id: i64) -> Result<bool> {
        let body = self.post(&format!("delete_expense/{}", expense_id), None).await?;
        ensure_no_errors(&body)?;
        take_field(body, "success")
    }

    // Friend operations
    pub async fn get_friends(&self) -> Result<Vec<Friend>> {
        let body = self.get("get_friends", None).await?;
        take_field(body, "friends")
    }

    pub async fn get_friend(&self, friend_id: i64) -> Result<Friend> {
        let body = self.get(&format!("get_friend/{}", friend_id), None).await?;
        take_field(body, "friend")
    }

    pub async fn create_friend(&self, friend: &NewFriend) -> Result<Vec<Friend>> {
        let params = ParamMap::from_serialize(friend)?;
        let body = self.post("create_friend", Some(&params)).await?;
        take_field(body, "friends")
    }

    pub async fn create_friends(&self, friends: &[NewFriend]) -> Result<Vec<Friend>> {
        let friends = friends
            .iter()
            .map(ParamMap::from_serialize)
            .collect::<Result<Vec<_>, _>>()?;

        let params = ParamMap::new().with("friends", encode_object_array("friends", &friends));
        let body = self.post("create_friends", Some(&params)).await?;
        take_field(body, "friends")
    }

    /// Ends the friendship between the current user and `friend_id`.
    pub async fn delete_friend(&self, friend_id: i64) -> Result<bool> {
        let body = self.post(&format!("delete_friend/{}", friend_id), None).await?;
        take_field(body, "success")
    }

    pub async fn get_notifications(&self) -> Result<Vec<Notification>> {
        let body = self.get("get_notifications", None).await?;
        take_field(body, "notifications")
    }
}

/// Moves `name` out of a response body and deserializes it.
fn take_field<T: DeserializeOwned>(mut body: Value, name: &str) -> Result<T> {
    let field = body
        .get_mut(name)
        .map(Value::take)
        .ok_or_else(|| ApiError::MalformedResponse(format!("response is missing `{}`", name)))?;

    serde_json::from_value(field).map_err(|e| {
        tracing::error!("Failed to parse `{}` from response: {}", name, e);
        ApiError::MalformedResponse(format!("`{}` has an unexpected shape: {}", name, e)).into()
    })
}

fn ensure_success(body: &Value) -> Result<(), ApiError> {
    match body.get("success").and_then(Value::as_bool) {
        Some(true) => Ok(()),
        _ => Err(ApiError::Rejected {
            errors: body.get("errors").cloned().unwrap_or(Value::Null),
        }),
    }
}

fn ensure_no_errors(body: &Value) -> Result<(), ApiError> {
    if has_errors(body.get("errors")) {
        return Err(ApiError::Rejected {
            errors: body["errors"].clone(),
        });
    }
    Ok(())
}
