use std::io::Write;

use anyhow::Result;

use crate::{config::IdentityTable, query::DigestEntry};

pub fn format_age(days: i64) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{days} days")
    }
}

/// `name (STATE), ...` for every reviewer. Reviewers whose review went stale
/// are mentioned so they get notified.
fn format_reviews(entry: &DigestEntry, identities: &IdentityTable) -> String {
    entry
        .reviews
        .iter()
        .map(|review| {
            let name = if review.is_pending(&entry.pull_request) {
                identities.mention(&review.author)
            } else {
                identities.display(&review.author)
            };
            format!("{} ({})", name, review.state)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Requested reviewers who have not reviewed at all yet.
fn format_pending_reviewers(entry: &DigestEntry, identities: &IdentityTable) -> String {
    let pending: Vec<String> = entry
        .pull_request
        .requested_reviewers()
        .into_iter()
        .filter(|login| !entry.reviews.iter().any(|review| review.author == *login))
        .map(|login| identities.display(login))
        .collect();

    if pending.is_empty() {
        "N/A".to_string()
    } else {
        pending.join(", ")
    }
}

/// Renders one pull request as a digest block. The author is mentioned only
/// when it is their turn to act.
pub fn format_entry(entry: &DigestEntry, identities: &IdentityTable) -> String {
    let pr = &entry.pull_request;
    let author = if entry.actionable_by_author {
        identities.mention(&pr.author)
    } else {
        identities.display(&pr.author)
    };

    let mut lines = vec![
        format!(
            "{} submitted {} \"{}\", updated {} ago:",
            author,
            entry.repository,
            pr.title,
            format_age(entry.age_days)
        ),
        format!("    - {}", pr.url),
    ];

    if !entry.reviews.is_empty() {
        lines.push(format!(
            "    - Reviewed by: {}",
            format_reviews(entry, identities)
        ));
    }

    lines.push(format!(
        "    - Pending reviews from: {}",
        format_pending_reviewers(entry, identities)
    ));

    lines.join("\n")
}

/// Writes every entry, one block straight after another.
pub fn write_digest<W: Write>(
    entries: &[DigestEntry],
    identities: &IdentityTable,
    writer: &mut W,
) -> Result<()> {
    for entry in entries {
        writeln!(writer, "{}", format_entry(entry, identities))?;
    }
    writer.flush()?;
    Ok(())
}
