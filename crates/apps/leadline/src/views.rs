//! Text rendering for the dashboard views

use chrono::{DateTime, Local, Utc};
use crm::{
    ContactRecord, ConversationThread, DeliveryStatus, LeadBoard, MessageRecord, MessageStats,
    Profile,
};

/// Width of the thread view; outbound bubbles are right-aligned within it
const VIEW_WIDTH: usize = 72;

/// Short relative date for list rows
pub fn format_list_date(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let local = at.with_timezone(&Local);
    let now = now.with_timezone(&Local);

    if local.date_naive() == now.date_naive() {
        // Today: show time
        local.format("%H:%M").to_string()
    } else if (now - local).num_days() < 7 {
        // This week: show day name
        local.format("%a").to_string()
    } else {
        local.format("%b %d").to_string()
    }
}

fn format_full_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format("%b %d, %Y at %H:%M")
        .to_string()
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// One row per thread: avatar, counterparty, preview, count and date
pub fn render_thread_list(threads: &[ConversationThread], now: DateTime<Utc>) -> String {
    if threads.is_empty() {
        return "No conversations yet\n".to_string();
    }

    let mut out = String::new();
    for thread in threads {
        let who = if thread.is_unknown() {
            "Unknown sender"
        } else {
            thread.counterparty_phone.as_str()
        };
        out.push_str(&format!(
            "[{}] {:<16} {:<40} {:>3}  {}\n",
            thread.avatar_label(),
            who,
            truncate(&thread.preview_text, 40),
            thread.message_count(),
            format_list_date(thread.preview_timestamp, now),
        ));
    }
    out
}

fn delivery_marker(message: &MessageRecord) -> &'static str {
    match message.delivery {
        Some(DeliveryStatus::Pending) => " …",
        Some(DeliveryStatus::Failed) => " ✗ failed",
        Some(DeliveryStatus::Delivered) => " ✓",
        None => "",
    }
}

/// Bubble content: text, attachment link, or both
fn bubble_lines(message: &MessageRecord) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(text) = message.text() {
        lines.extend(text.lines().map(str::to_string));
    }
    if message.has_attachment()
        && let Some(url) = &message.attachment_url
    {
        lines.push(format!("📎 {url}"));
    }
    lines
}

/// Render one conversation as chat bubbles.
///
/// Only messages proven outbound go on the account side (right); inbound
/// and unclassified messages go on the left.
pub fn render_thread(thread: &ConversationThread, contact: Option<&ContactRecord>) -> String {
    let mut out = String::new();
    let title = contact
        .map(ContactRecord::display_name)
        .unwrap_or(&thread.counterparty_phone);
    out.push_str(&format!("── {} ──\n", title));
    if let Some(contact) = contact {
        out.push_str(&format!(
            "   {} · {} · {}\n",
            contact.counterparty_phone,
            contact.status.label(),
            contact.id.as_str()
        ));
    }

    for message in &thread.messages {
        let outbound = message.direction().renders_outbound();
        let mut lines = bubble_lines(message);
        lines.push(format!(
            "#{} {}{}",
            message.id,
            format_full_date(message.created_at),
            if outbound { delivery_marker(message) } else { "" }
        ));

        out.push('\n');
        for line in lines {
            if outbound {
                out.push_str(&format!("{:>width$}\n", line, width = VIEW_WIDTH));
            } else {
                out.push_str(&line);
                out.push('\n');
            }
        }
    }
    out
}

pub fn render_stats(stats: &MessageStats) -> String {
    format!(
        "Messages:       {}\n\
         Sent:           {}\n\
         Received:       {}\n\
         Conversations:  {}\n\
         Attachments:    {}\n",
        stats.total,
        stats.sent,
        stats.received_or_unknown(),
        stats.conversations,
        stats.with_attachment,
    )
}

/// Board as one block per column
pub fn render_board(board: &LeadBoard) -> String {
    let mut out = String::new();
    for column in &board.columns {
        out.push_str(&format!("{} ({})\n", column.status.label(), column.count()));
        for contact in &column.contacts {
            out.push_str(&format!(
                "  {}  {:<24} {}\n",
                contact.id.as_str(),
                contact.display_name(),
                contact.counterparty_phone
            ));
        }
    }
    out
}

pub fn render_contact(contact: &ContactRecord) -> String {
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    format!(
        "Id:      {}\n\
         Phone:   {}\n\
         Name:    {}\n\
         Email:   {}\n\
         Status:  {}\n\
         Notes:   {}\n\
         Updated: {}\n",
        contact.id.as_str(),
        contact.counterparty_phone,
        field(&contact.name),
        field(&contact.email),
        contact.status.label(),
        field(&contact.notes),
        format_full_date(contact.updated_at),
    )
}

pub fn render_profile(profile: &Profile) -> String {
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    format!(
        "User:   {}\nName:   {}\nEmail:  {}\nPhone:  {}\n",
        profile.user_id,
        field(&profile.full_name),
        field(&profile.email),
        field(&profile.phone_number),
    )
}
