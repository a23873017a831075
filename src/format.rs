use chrono::{DateTime, Utc};

use crate::activity::ActivityRecord;
use crate::models::{FileChange, Issue, PullRequest, User};

pub const BLOCK_SEPARATOR: &str = "\n\n---\n\n";
pub const ACTIVITY_SEPARATOR: &str = "\n\n====\n\n";

/// Whole days between `iso_ts` and `now`. `None` for missing or unparsable input.
pub fn iso_age_days(iso_ts: Option<&str>, now: DateTime<Utc>) -> Option<i64> {
    let ts = iso_ts?.trim();
    if ts.is_empty() {
        return None;
    }
    let dt = DateTime::parse_from_rfc3339(ts).ok()?;
    Some(now.signed_duration_since(dt.with_timezone(&Utc)).num_days())
}

fn age_text(iso_ts: Option<&str>, now: DateTime<Utc>) -> String {
    match iso_age_days(iso_ts, now) {
        Some(d) => format!("{} days ago", d),
        None => "unknown".to_string(),
    }
}

fn login(user: &Option<User>) -> &str {
    user.as_ref()
        .map(|u| u.login.as_str())
        .filter(|l| !l.is_empty())
        .unwrap_or("unknown")
}

pub fn format_issue(issue: &Issue, now: DateTime<Utc>) -> String {
    format!(
        "#{} [{}] {}\nAuthor: {}  Updated: {}\nURL: {}",
        issue.number,
        issue.state,
        issue.title,
        login(&issue.user),
        age_text(issue.updated_at.as_deref(), now),
        issue.html_url
    )
}

pub fn format_pr(pr: &PullRequest, now: DateTime<Utc>) -> String {
    format!(
        "PR #{} {} by {} [{}]\nHead: {}  Base: {}\nUpdated: {}\nURL: {}",
        pr.number,
        pr.title,
        login(&pr.user),
        pr.state,
        pr.head.ref_name,
        pr.base.ref_name,
        age_text(pr.updated_at.as_deref(), now),
        pr.html_url
    )
}

pub fn format_file_change(f: &FileChange) -> String {
    format!(
        "{}  (+{} / -{}, {} changes)\nStatus: {}  Blob: {}",
        f.filename, f.additions, f.deletions, f.changes, f.status, f.blob_url
    )
}

pub fn format_repo_activity(rec: &ActivityRecord, now: DateTime<Utc>) -> String {
    let flags = rec.flags();
    let flags_txt = if flags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", flags.join(","))
    };
    let last = rec.last_activity.as_deref().unwrap_or("N/A");
    format!(
        "{}{}\nDefault branch: {}\nLast activity: {} ({})\nURL: {}\nSource: {}",
        rec.repo,
        flags_txt,
        rec.default_branch,
        last,
        age_text(rec.last_activity.as_deref(), now),
        rec.html_url,
        rec.source
    )
}
