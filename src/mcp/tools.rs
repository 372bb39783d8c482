//! MCP Tool definitions and handlers
//!
//! Defines the fixed tool catalog and routes each call to the Gmail client.
//! Tool calls are parsed into a typed request enum up front; handlers never
//! see raw JSON.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::OnceCell;

use crate::config::Config;
use crate::error::{AuthError, GmailMcpError, McpError, Result};
use crate::gmail::auth::Authenticator;
use crate::gmail::client::{BatchOutcome, GmailClient};
use crate::gmail::message::OutgoingEmail;
use crate::gmail::summary::{email_list_summary, label_summary, search_summary, thread_summary};
use crate::mcp::types::{CallToolResult, Tool};

fn default_max_read_results() -> u32 {
    10
}

fn default_max_search_results() -> u32 {
    25
}

/// Arguments for `read_emails`
#[derive(Debug, Clone, Deserialize)]
pub struct ReadEmailsArgs {
    /// Gmail search query, empty for the whole mailbox
    #[serde(default)]
    pub query: String,

    #[serde(default = "default_max_read_results")]
    pub max_results: u32,

    #[serde(default)]
    pub include_body: bool,
}

/// Arguments for `send_email` and `create_draft`
#[derive(Debug, Clone, Deserialize)]
pub struct SendEmailArgs {
    pub to: String,
    pub subject: String,
    pub body: String,

    #[serde(default)]
    pub cc: Option<String>,

    #[serde(default)]
    pub bcc: Option<String>,

    #[serde(default)]
    pub html: bool,
}

impl From<SendEmailArgs> for OutgoingEmail {
    fn from(args: SendEmailArgs) -> Self {
        OutgoingEmail {
            to: args.to,
            subject: args.subject,
            body: args.body,
            cc: args.cc,
            bcc: args.bcc,
            html: args.html,
        }
    }
}

/// Arguments for `search_emails`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchEmailsArgs {
    pub query: String,

    #[serde(default = "default_max_search_results")]
    pub max_results: u32,
}

/// Arguments for `get_email_thread`
#[derive(Debug, Clone, Deserialize)]
pub struct GetEmailThreadArgs {
    pub thread_id: String,
}

/// Arguments for `mark_as_read`
#[derive(Debug, Clone, Deserialize)]
pub struct MarkAsReadArgs {
    pub message_ids: Vec<String>,
}

/// Arguments for `add_labels`
#[derive(Debug, Clone, Deserialize)]
pub struct AddLabelsArgs {
    pub message_ids: Vec<String>,
    pub label_ids: Vec<String>,
}

/// A parsed tool call, one variant per catalog entry
#[derive(Debug, Clone)]
pub enum ToolRequest {
    ReadEmails(ReadEmailsArgs),
    SendEmail(SendEmailArgs),
    SearchEmails(SearchEmailsArgs),
    GetLabels,
    GetEmailThread(GetEmailThreadArgs),
    MarkAsRead(MarkAsReadArgs),
    AddLabels(AddLabelsArgs),
    CreateDraft(SendEmailArgs),
    GetAuthUrl,
}

fn parse_args<T: DeserializeOwned>(args: Value) -> std::result::Result<T, McpError> {
    serde_json::from_value(args).map_err(|e| McpError::InvalidArguments {
        message: e.to_string(),
    })
}

impl ToolRequest {
    /// Parse a named tool call with its JSON arguments
    ///
    /// Clients may omit the arguments object entirely; that is treated the
    /// same as passing an empty one.
    pub fn parse(name: &str, args: Value) -> std::result::Result<Self, McpError> {
        let args = if args.is_null() { json!({}) } else { args };

        match name {
            "read_emails" => Ok(Self::ReadEmails(parse_args(args)?)),
            "send_email" => Ok(Self::SendEmail(parse_args(args)?)),
            "search_emails" => Ok(Self::SearchEmails(parse_args(args)?)),
            "get_labels" => Ok(Self::GetLabels),
            "get_email_thread" => Ok(Self::GetEmailThread(parse_args(args)?)),
            "mark_as_read" => Ok(Self::MarkAsRead(parse_args(args)?)),
            "add_labels" => Ok(Self::AddLabels(parse_args(args)?)),
            "create_draft" => Ok(Self::CreateDraft(parse_args(args)?)),
            "get_auth_url" => Ok(Self::GetAuthUrl),
            _ => Err(McpError::UnknownTool {
                name: name.to_string(),
            }),
        }
    }
}

/// Tool handler
pub struct ToolHandler {
    config: Config,

    /// Authenticated Gmail client, initialized at most once per process
    client: OnceCell<Arc<GmailClient>>,
}

impl ToolHandler {
    /// Create a new tool handler
    pub fn new(config: Config) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    /// Get the Gmail client, initializing it on first use
    ///
    /// Initialization fails (and is retried on the next call) when the keys
    /// or token file is missing; `get_auth_url` stays callable regardless.
    async fn client(&self) -> Result<&Arc<GmailClient>> {
        self.client
            .get_or_try_init(|| async {
                let authenticator = Authenticator::new(self.config.clone()).await?;

                if !authenticator.is_authenticated().await {
                    return Err(GmailMcpError::Auth(AuthError::TokenNotFound {
                        path: self.config.token_path.display().to_string(),
                    }));
                }

                Ok(Arc::new(GmailClient::new(Arc::new(authenticator))))
            })
            .await
    }

    /// List all available tools
    pub fn list_tools(&self) -> Vec<Tool> {
        vec![
            tool_def(
                "read_emails",
                "Read emails from Gmail inbox with optional filters and limits",
                read_emails_schema(),
            ),
            tool_def("send_email", "Send an email through Gmail", send_email_schema()),
            tool_def(
                "search_emails",
                "Search emails with advanced Gmail search syntax",
                search_emails_schema(),
            ),
            tool_def(
                "get_labels",
                "Get all Gmail labels/folders",
                json!({"type": "object", "properties": {}}),
            ),
            tool_def(
                "get_email_thread",
                "Get a complete email thread/conversation by thread ID",
                get_email_thread_schema(),
            ),
            tool_def("mark_as_read", "Mark emails as read", mark_as_read_schema()),
            tool_def("add_labels", "Add labels to emails", add_labels_schema()),
            tool_def(
                "create_draft",
                "Create a draft email in Gmail (saves to drafts folder without sending)",
                send_email_schema(),
            ),
            tool_def(
                "get_auth_url",
                "Get OAuth2 authorization URL for Gmail API access (for initial setup)",
                json!({"type": "object", "properties": {}}),
            ),
        ]
    }

    /// Call a tool by name
    ///
    /// All failures are converted into a textual error result; nothing is
    /// ever propagated to the transport layer.
    pub async fn call_tool(&self, name: &str, args: Value) -> CallToolResult {
        let request = match ToolRequest::parse(name, args) {
            Ok(request) => request,
            Err(e) => return CallToolResult::execution_error(name, e),
        };

        match self.dispatch(request).await {
            Ok(text) => CallToolResult::text(text),
            Err(e) => CallToolResult::execution_error(name, e),
        }
    }

    async fn dispatch(&self, request: ToolRequest) -> Result<String> {
        match request {
            ToolRequest::ReadEmails(args) => self.read_emails(args).await,
            ToolRequest::SendEmail(args) => self.send_email(args).await,
            ToolRequest::SearchEmails(args) => self.search_emails(args).await,
            ToolRequest::GetLabels => self.get_labels().await,
            ToolRequest::GetEmailThread(args) => self.get_email_thread(args).await,
            ToolRequest::MarkAsRead(args) => self.mark_as_read(args).await,
            ToolRequest::AddLabels(args) => self.add_labels(args).await,
            ToolRequest::CreateDraft(args) => self.create_draft(args).await,
            ToolRequest::GetAuthUrl => self.get_auth_url().await,
        }
    }

    // ==================== Tool Handlers ====================

    async fn read_emails(&self, args: ReadEmailsArgs) -> Result<String> {
        let client = self.client().await?;
        let emails = client
            .fetch_emails(&args.query, args.max_results, args.include_body)
            .await?;

        Ok(email_list_summary(&emails, &args.query, args.include_body))
    }

    async fn send_email(&self, args: SendEmailArgs) -> Result<String> {
        let client = self.client().await?;
        let email: OutgoingEmail = args.into();
        let message = client.send_email(&email).await?;

        Ok(format!(
            "Email sent successfully!\n\n**To**: {}\n**Subject**: {}\n**Message ID**: {}\n**Thread ID**: {}",
            email.to,
            email.subject,
            message.id,
            message.thread_id.unwrap_or_default()
        ))
    }

    async fn search_emails(&self, args: SearchEmailsArgs) -> Result<String> {
        let client = self.client().await?;
        let emails = client.search_emails(&args.query, args.max_results).await?;

        Ok(search_summary(&emails, &args.query))
    }

    async fn get_labels(&self) -> Result<String> {
        let client = self.client().await?;
        let labels = client.list_labels().await?;

        Ok(label_summary(&labels))
    }

    async fn get_email_thread(&self, args: GetEmailThreadArgs) -> Result<String> {
        let client = self.client().await?;
        let emails = client.fetch_thread_emails(&args.thread_id).await?;

        Ok(thread_summary(&args.thread_id, &emails))
    }

    async fn mark_as_read(&self, args: MarkAsReadArgs) -> Result<String> {
        let client = self.client().await?;
        let outcome = client.mark_as_read(&args.message_ids).await?;

        Ok(batch_report(
            &format!("Marked {} email(s) as read", outcome.success_count),
            &outcome,
        ))
    }

    async fn add_labels(&self, args: AddLabelsArgs) -> Result<String> {
        let client = self.client().await?;
        let outcome = client.add_labels(&args.message_ids, &args.label_ids).await?;

        Ok(batch_report(
            &format!("Added labels to {} email(s)", outcome.success_count),
            &outcome,
        ))
    }

    async fn create_draft(&self, args: SendEmailArgs) -> Result<String> {
        let client = self.client().await?;
        let email: OutgoingEmail = args.into();
        let draft = client.create_draft(&email).await?;

        Ok(format!(
            "Draft created successfully!\n\n**To**: {}\n**Subject**: {}\n**Draft ID**: {}\n**Status**: Saved to Gmail Drafts folder - ready to send when you're ready!",
            email.to, email.subject, draft.id
        ))
    }

    async fn get_auth_url(&self) -> Result<String> {
        // Needs only the keys file; works before any token exists
        let authenticator = Authenticator::new(self.config.clone()).await?;
        let auth_url = authenticator.generate_auth_url();

        Ok(format!(
            "# Gmail OAuth2 Authorization\n\n\
             **Step 1**: Visit this URL to authorize the app:\n\n{}\n\n\
             **Step 2**: Run `gmail-mcp auth` to complete the flow and store the token automatically.\n\n\
             **Credentials Path**: {}\n**Token Path**: {}",
            auth_url,
            authenticator.keys_path().display(),
            authenticator.token_path().display()
        ))
    }
}

/// Render a batch outcome, listing any ids that failed
fn batch_report(headline: &str, outcome: &BatchOutcome) -> String {
    let mut text = headline.to_string();

    if !outcome.failures.is_empty() {
        text.push_str(&format!(
            "\nFailed to modify {} message(s):\n",
            outcome.failures.len()
        ));
        for (id, err) in &outcome.failures {
            text.push_str(&format!("- {} ({})\n", id, err));
        }
    }

    text
}

// ==================== Schema Definitions ====================

fn tool_def(name: &str, description: &str, input_schema: Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema,
    }
}

fn read_emails_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "Gmail search query (e.g., \"from:someone@example.com\", \"is:unread\", \"subject:important\")",
                "default": ""
            },
            "max_results": {
                "type": "number",
                "description": "Maximum number of emails to retrieve",
                "default": 10,
                "maximum": 100
            },
            "include_body": {
                "type": "boolean",
                "description": "Whether to include email body content",
                "default": false
            }
        }
    })
}

fn send_email_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "to": {
                "type": "string",
                "description": "Recipient email address"
            },
            "subject": {
                "type": "string",
                "description": "Email subject line"
            },
            "body": {
                "type": "string",
                "description": "Email body content"
            },
            "cc": {
                "type": "string",
                "description": "CC recipients (optional)"
            },
            "bcc": {
                "type": "string",
                "description": "BCC recipients (optional)"
            },
            "html": {
                "type": "boolean",
                "description": "Whether body is HTML format",
                "default": false
            }
        },
        "required": ["to", "subject", "body"]
    })
}

fn search_emails_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "Gmail search query (supports all Gmail operators like from:, to:, subject:, has:attachment, etc.)"
            },
            "max_results": {
                "type": "number",
                "description": "Maximum number of results to return",
                "default": 25,
                "maximum": 100
            }
        },
        "required": ["query"]
    })
}

fn get_email_thread_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "thread_id": {
                "type": "string",
                "description": "Gmail thread ID"
            }
        },
        "required": ["thread_id"]
    })
}

fn mark_as_read_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "message_ids": {
                "type": "array",
                "items": {"type": "string"},
                "description": "Array of Gmail message IDs to mark as read"
            }
        },
        "required": ["message_ids"]
    })
}

fn add_labels_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "message_ids": {
                "type": "array",
                "items": {"type": "string"},
                "description": "Array of Gmail message IDs"
            },
            "label_ids": {
                "type": "array",
                "items": {"type": "string"},
                "description": "Array of label IDs to add"
            }
        },
        "required": ["message_ids", "label_ids"]
    })
}
