//! Gmail API client
//!
//! High-level client for Gmail API operations. Each tool invocation maps to
//! a strictly sequential series of calls here; there is no retry, caching,
//! or pagination beyond a single capped page.

use std::sync::Arc;

use crate::config::gmail::{API_BASE_URL, MAX_RESULTS_CAP, UNREAD_LABEL, USER_ID};
use crate::error::{GmailApiError, GmailMcpError, Result};
use crate::gmail::auth::Authenticator;
use crate::gmail::message::{build_raw_email, encode_raw_message, parse_message, EmailMessage, OutgoingEmail};
use crate::gmail::types::{
    CreateDraftRequest, Draft, Label, LabelList, Message, MessageList, ModifyMessageRequest,
    SendMessageRequest, Thread,
};

/// Fetch format for message gets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFormat {
    /// Full payload tree, including body data
    Full,
    /// Headers and snippet only
    Metadata,
}

impl MessageFormat {
    fn as_str(&self) -> &'static str {
        match self {
            MessageFormat::Full => "full",
            MessageFormat::Metadata => "metadata",
        }
    }
}

/// Outcome of a sequential batch modify
///
/// Ids are processed independently and in order; a failure partway through
/// leaves the earlier modifications in effect.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Ids modified successfully
    pub success_count: usize,

    /// Ids that failed, with the provider error text
    pub failures: Vec<(String, String)>,
}

/// Gmail API client
pub struct GmailClient {
    /// HTTP client
    http_client: reqwest::Client,

    /// OAuth authenticator
    authenticator: Arc<Authenticator>,
}

impl GmailClient {
    /// Create a new Gmail client
    pub fn new(authenticator: Arc<Authenticator>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            authenticator,
        }
    }

    /// Get a valid access token
    async fn access_token(&self) -> Result<String> {
        self.authenticator.get_access_token().await
    }

    /// Base URL for messages
    fn messages_url() -> String {
        format!("{}/users/{}/messages", API_BASE_URL, USER_ID)
    }

    /// Base URL for drafts
    fn drafts_url() -> String {
        format!("{}/users/{}/drafts", API_BASE_URL, USER_ID)
    }

    /// Base URL for labels
    fn labels_url() -> String {
        format!("{}/users/{}/labels", API_BASE_URL, USER_ID)
    }

    /// Base URL for threads
    fn threads_url() -> String {
        format!("{}/users/{}/threads", API_BASE_URL, USER_ID)
    }

    // ==================== Message Operations ====================

    /// List message ids matching a query (single page, capped)
    pub async fn list_messages(&self, query: &str, max_results: u32) -> Result<MessageList> {
        let token = self.access_token().await?;
        let max = max_results.min(MAX_RESULTS_CAP);

        let url = format!(
            "{}?q={}&maxResults={}",
            Self::messages_url(),
            urlencoding::encode(query),
            max
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(GmailMcpError::Gmail(GmailApiError::RequestFailed {
                message: format!("Failed to list messages ({}): {}", status, text),
            }))
        }
    }

    /// Get a message by ID
    pub async fn get_message(&self, message_id: &str, format: MessageFormat) -> Result<Message> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/{}?format={}",
            Self::messages_url(),
            message_id,
            format.as_str()
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else if response.status().as_u16() == 404 {
            Err(GmailMcpError::Gmail(GmailApiError::MessageNotFound {
                message_id: message_id.to_string(),
            }))
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(GmailMcpError::Gmail(GmailApiError::RequestFailed {
                message: format!("Failed to get message ({}): {}", status, text),
            }))
        }
    }

    /// Fetch and parse emails matching a query (read path)
    ///
    /// One list call, then one get per result. The full payload is fetched
    /// only when bodies were requested.
    pub async fn fetch_emails(
        &self,
        query: &str,
        max_results: u32,
        include_body: bool,
    ) -> Result<Vec<EmailMessage>> {
        let list = self.list_messages(query, max_results).await?;

        let format = if include_body {
            MessageFormat::Full
        } else {
            MessageFormat::Metadata
        };

        let mut emails = Vec::with_capacity(list.messages.len());
        for msg_ref in &list.messages {
            let message = self.get_message(&msg_ref.id, format).await?;
            emails.push(parse_message(&message, include_body));
        }

        Ok(emails)
    }

    /// Search for emails and return metadata-only records
    pub async fn search_emails(&self, query: &str, max_results: u32) -> Result<Vec<EmailMessage>> {
        self.fetch_emails(query, max_results, false).await
    }

    /// Get a thread with all of its messages
    pub async fn get_thread(&self, thread_id: &str) -> Result<Thread> {
        let token = self.access_token().await?;
        let url = format!("{}/{}", Self::threads_url(), thread_id);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else if response.status().as_u16() == 404 {
            Err(GmailMcpError::Gmail(GmailApiError::ThreadNotFound {
                thread_id: thread_id.to_string(),
            }))
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(GmailMcpError::Gmail(GmailApiError::RequestFailed {
                message: format!("Failed to get thread ({}): {}", status, text),
            }))
        }
    }

    /// Fetch a thread and parse every message with its body
    pub async fn fetch_thread_emails(&self, thread_id: &str) -> Result<Vec<EmailMessage>> {
        let thread = self.get_thread(thread_id).await?;
        Ok(thread
            .messages
            .iter()
            .map(|message| parse_message(message, true))
            .collect())
    }

    /// Send an email
    pub async fn send_email(&self, email: &OutgoingEmail) -> Result<Message> {
        let token = self.access_token().await?;

        let raw = build_raw_email(email);
        let request = SendMessageRequest {
            raw: encode_raw_message(&raw),
        };

        let url = format!("{}/send", Self::messages_url());

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&token)
            .json(&request)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(GmailMcpError::Gmail(GmailApiError::RequestFailed {
                message: format!("Failed to send email ({}): {}", status, text),
            }))
        }
    }

    /// Create a draft
    pub async fn create_draft(&self, email: &OutgoingEmail) -> Result<Draft> {
        let token = self.access_token().await?;

        let raw = build_raw_email(email);
        let request = CreateDraftRequest {
            message: SendMessageRequest {
                raw: encode_raw_message(&raw),
            },
        };

        let response = self
            .http_client
            .post(Self::drafts_url())
            .bearer_auth(&token)
            .json(&request)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(GmailMcpError::Gmail(GmailApiError::RequestFailed {
                message: format!("Failed to create draft ({}): {}", status, text),
            }))
        }
    }

    /// Modify message labels
    pub async fn modify_message(
        &self,
        message_id: &str,
        add_label_ids: Option<Vec<String>>,
        remove_label_ids: Option<Vec<String>>,
    ) -> Result<Message> {
        let token = self.access_token().await?;
        let url = format!("{}/{}/modify", Self::messages_url(), message_id);

        let request = ModifyMessageRequest {
            add_label_ids,
            remove_label_ids,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&token)
            .json(&request)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else if response.status().as_u16() == 404 {
            Err(GmailMcpError::Gmail(GmailApiError::MessageNotFound {
                message_id: message_id.to_string(),
            }))
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(GmailMcpError::Gmail(GmailApiError::RequestFailed {
                message: format!("Failed to modify message ({}): {}", status, text),
            }))
        }
    }

    // ==================== Batch Operations ====================

    /// Mark messages as read, one modify call per id
    ///
    /// Modifications already applied stay applied when a later id fails.
    pub async fn mark_as_read(&self, message_ids: &[String]) -> Result<BatchOutcome> {
        self.modify_each(message_ids, None, Some(vec![UNREAD_LABEL.to_string()]))
            .await
    }

    /// Add labels to messages, one modify call per id
    pub async fn add_labels(
        &self,
        message_ids: &[String],
        label_ids: &[String],
    ) -> Result<BatchOutcome> {
        self.modify_each(message_ids, Some(label_ids.to_vec()), None)
            .await
    }

    async fn modify_each(
        &self,
        message_ids: &[String],
        add_label_ids: Option<Vec<String>>,
        remove_label_ids: Option<Vec<String>>,
    ) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();

        for message_id in message_ids {
            match self
                .modify_message(message_id, add_label_ids.clone(), remove_label_ids.clone())
                .await
            {
                Ok(_) => outcome.success_count += 1,
                Err(e) => outcome.failures.push((message_id.clone(), e.to_string())),
            }
        }

        Ok(outcome)
    }

    // ==================== Label Operations ====================

    /// List all labels
    pub async fn list_labels(&self) -> Result<Vec<Label>> {
        let token = self.access_token().await?;

        let response = self
            .http_client
            .get(Self::labels_url())
            .bearer_auth(&token)
            .send()
            .await?;

        if response.status().is_success() {
            let label_list: LabelList = response.json().await?;
            Ok(label_list.labels)
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(GmailMcpError::Gmail(GmailApiError::RequestFailed {
                message: format!("Failed to list labels ({}): {}", status, text),
            }))
        }
    }
}
