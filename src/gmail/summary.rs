//! Text report rendering for email collections
//!
//! Renders normalized email records, threads, and label listings into the
//! markdown-flavored text handed back to the calling agent.

use crate::gmail::message::EmailMessage;
use crate::gmail::types::Label;

/// Character limit for body previews in list and thread reports
pub const BODY_PREVIEW_LIMIT: usize = 300;

/// Truncate a body to `limit` characters, appending "..." on truncation
///
/// Bodies at or under the limit pass through unmodified.
pub fn truncate_body(body: &str, limit: usize) -> String {
    if body.chars().count() > limit {
        let mut truncated: String = body.chars().take(limit).collect();
        truncated.push_str("...");
        truncated
    } else {
        body.to_string()
    }
}

/// Render a list of emails for the read path
///
/// Body previews appear only when a body was requested and extraction
/// produced something.
pub fn email_list_summary(emails: &[EmailMessage], query: &str, include_body: bool) -> String {
    let query_text = if query.is_empty() {
        String::new()
    } else {
        format!(" matching \"{}\"", query)
    };

    let mut summary = format!(
        "# Gmail Emails{}\n\n**Found**: {} emails\n\n",
        query_text,
        emails.len()
    );

    for (index, email) in emails.iter().enumerate() {
        let subject = if email.subject.is_empty() {
            "No Subject"
        } else {
            &email.subject
        };

        summary.push_str(&format!("## {}. {}\n", index + 1, subject));
        summary.push_str(&format!("**From**: {}\n", email.from));
        summary.push_str(&format!("**To**: {}\n", email.to));
        summary.push_str(&format!("**Date**: {}\n", email.date));
        summary.push_str(&format!("**ID**: {}\n", email.id));
        summary.push_str(&format!("**Thread**: {}\n", email.thread_id));
        summary.push_str(&format!("**Preview**: {}\n", email.snippet));

        if include_body && !email.body.is_empty() {
            summary.push_str(&format!(
                "\n**Content**:\n{}\n",
                truncate_body(&email.body, BODY_PREVIEW_LIMIT)
            ));
        }

        summary.push_str("\n---\n\n");
    }

    summary
}

/// Render search results (metadata only, no bodies)
pub fn search_summary(emails: &[EmailMessage], query: &str) -> String {
    let mut summary = format!(
        "# Gmail Search Results\n\n**Query**: \"{}\"\n**Found**: {} emails\n\n",
        query,
        emails.len()
    );

    let sections: Vec<String> = emails
        .iter()
        .enumerate()
        .map(|(index, email)| {
            format!(
                "## {}. {}\n**From**: {}\n**Date**: {}\n**Preview**: {}\n**ID**: {}\n",
                index + 1,
                email.subject,
                email.from,
                email.date,
                email.snippet,
                email.id
            )
        })
        .collect();

    summary.push_str(&sections.join("\n"));
    summary
}

/// Render a full conversation thread
pub fn thread_summary(thread_id: &str, emails: &[EmailMessage]) -> String {
    let mut summary = format!(
        "# Email Thread\n\n**Thread ID**: {}\n**Messages**: {}\n\n",
        thread_id,
        emails.len()
    );

    for (index, email) in emails.iter().enumerate() {
        summary.push_str(&format!("## Message {}\n", index + 1));
        summary.push_str(&format!("**From**: {}\n", email.from));
        summary.push_str(&format!("**To**: {}\n", email.to));
        summary.push_str(&format!("**Date**: {}\n", email.date));
        summary.push_str(&format!("**Subject**: {}\n\n", email.subject));

        if !email.body.is_empty() {
            summary.push_str(&format!(
                "**Content**:\n{}\n\n",
                truncate_body(&email.body, BODY_PREVIEW_LIMIT)
            ));
        }

        summary.push_str("---\n\n");
    }

    summary
}

/// Render the label listing, one line per label
pub fn label_summary(labels: &[Label]) -> String {
    let mut summary = format!("# Gmail Labels\n\n**Total Labels**: {}\n\n", labels.len());

    let lines: Vec<String> = labels
        .iter()
        .map(|label| {
            format!(
                "- **{}** ({}) - Type: {}, Messages: {}",
                label.name,
                label.id,
                label.label_type.as_deref().unwrap_or("user"),
                label.messages_total.unwrap_or(0)
            )
        })
        .collect();

    summary.push_str(&lines.join("\n"));
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(subject: &str, body: &str) -> EmailMessage {
        EmailMessage {
            id: "m1".to_string(),
            thread_id: "t1".to_string(),
            snippet: "preview text".to_string(),
            from: "sender@example.com".to_string(),
            to: "me@example.com".to_string(),
            subject: subject.to_string(),
            date: "Mon, 1 Jan 2024 10:00:00 +0000".to_string(),
            body: body.to_string(),
            labels: vec![],
        }
    }

    #[test]
    fn test_truncate_body_under_limit() {
        assert_eq!(truncate_body("0123456789ABC", 300), "0123456789ABC");
    }

    #[test]
    fn test_truncate_body_at_limit() {
        let body = "x".repeat(300);
        assert_eq!(truncate_body(&body, 300), body);
    }

    #[test]
    fn test_truncate_body_over_limit() {
        let body = "a".repeat(310);
        let truncated = truncate_body(&body, 300);
        assert_eq!(truncated.len(), 303);
        assert_eq!(&truncated[..300], &body[..300]);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_truncate_body_multibyte() {
        let body = "é".repeat(301);
        let truncated = truncate_body(&body, 300);
        assert_eq!(truncated.chars().count(), 303);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_list_summary_short_body_not_truncated() {
        let emails = vec![email("First", "0123456789ABC"), email("Second", "0123456789ABC")];
        let summary = email_list_summary(&emails, "is:unread", true);

        assert!(summary.contains("# Gmail Emails matching \"is:unread\""));
        assert!(summary.contains("**Found**: 2 emails"));
        assert!(summary.contains("## 1. First"));
        assert!(summary.contains("## 2. Second"));
        assert!(summary.contains("**Content**:\n0123456789ABC\n"));
        assert!(!summary.contains("0123456789ABC..."));
    }

    #[test]
    fn test_list_summary_long_body_truncated() {
        let body = "b".repeat(310);
        let summary = email_list_summary(&[email("Long", &body)], "", true);

        let expected = format!("{}...", "b".repeat(300));
        assert!(summary.contains(&expected));
        assert!(!summary.contains(&"b".repeat(301)));
    }

    #[test]
    fn test_list_summary_empty_query_omits_matching_clause() {
        let summary = email_list_summary(&[email("Hi", "")], "", false);
        assert!(summary.starts_with("# Gmail Emails\n\n"));
        assert!(!summary.contains("matching"));
    }

    #[test]
    fn test_list_summary_body_hidden_when_not_requested() {
        let summary = email_list_summary(&[email("Hi", "secret body")], "", false);
        assert!(!summary.contains("**Content**"));
        assert!(!summary.contains("secret body"));
    }

    #[test]
    fn test_list_summary_empty_subject_placeholder() {
        let summary = email_list_summary(&[email("", "")], "", false);
        assert!(summary.contains("## 1. No Subject"));
    }

    #[test]
    fn test_search_summary_fields() {
        let summary = search_summary(&[email("Report", "")], "subject:report");

        assert!(summary.contains("# Gmail Search Results"));
        assert!(summary.contains("**Query**: \"subject:report\""));
        assert!(summary.contains("**Found**: 1 emails"));
        assert!(summary.contains("## 1. Report"));
        assert!(summary.contains("**Preview**: preview text"));
        assert!(summary.contains("**ID**: m1"));
    }

    #[test]
    fn test_thread_summary_truncates_bodies() {
        let long = email("Re: topic", &"c".repeat(310));
        let short = email("topic", "short reply");
        let summary = thread_summary("t1", &[short, long]);

        assert!(summary.contains("**Thread ID**: t1"));
        assert!(summary.contains("**Messages**: 2"));
        assert!(summary.contains("## Message 1"));
        assert!(summary.contains("## Message 2"));
        assert!(summary.contains("**Content**:\nshort reply\n"));
        assert!(summary.contains(&format!("{}...", "c".repeat(300))));
    }

    #[test]
    fn test_thread_summary_skips_empty_bodies() {
        let summary = thread_summary("t1", &[email("No body", "")]);
        assert!(!summary.contains("**Content**"));
    }

    #[test]
    fn test_label_summary() {
        let labels = vec![
            Label {
                id: "INBOX".to_string(),
                name: "INBOX".to_string(),
                label_type: Some("system".to_string()),
                messages_total: Some(128),
            },
            Label {
                id: "Label_7".to_string(),
                name: "Receipts".to_string(),
                label_type: None,
                messages_total: None,
            },
        ];

        let summary = label_summary(&labels);
        assert!(summary.contains("**Total Labels**: 2"));
        assert!(summary.contains("- **INBOX** (INBOX) - Type: system, Messages: 128"));
        assert!(summary.contains("- **Receipts** (Label_7) - Type: user, Messages: 0"));
    }
}
