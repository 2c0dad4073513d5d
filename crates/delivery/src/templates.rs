//! Lead notification and confirmation emails.
//!
//! Submission fields arrive already HTML-escaped, so they are interpolated
//! into bodies as-is. Subjects and recipients are plain text and get the
//! raw values back.

use intake_core::validation::unescape_html;
use intake_core::Submission;

use crate::config::EmailConfig;
use crate::email::OutboundEmail;

const STYLE: &str = "body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; }
.container { max-width: 600px; margin: 0 auto; padding: 20px; }
.header { background: linear-gradient(135deg, #22d3ee 0%, #a855f7 100%); color: white; padding: 20px; border-radius: 8px 8px 0 0; }
.content { background: #f9fafb; padding: 30px; border-radius: 0 0 8px 8px; }
.label { font-weight: bold; color: #6b7280; font-size: 12px; text-transform: uppercase; }
.value { margin: 5px 0 20px; padding: 10px; background: white; border-left: 3px solid #22d3ee; }
.footer { margin-top: 20px; padding-top: 20px; border-top: 1px solid #e5e7eb; font-size: 12px; color: #6b7280; }";

/// Renders the two emails sent for each accepted lead.
#[derive(Debug, Clone)]
pub struct EmailTemplates {
    from: String,
    operator: Option<String>,
    send_confirmation: bool,
    site_name: String,
    site_url: String,
}

impl EmailTemplates {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            from: config.from.clone(),
            operator: config.notification_email.clone().filter(|e| !e.is_empty()),
            send_confirmation: config.send_confirmation,
            site_name: config.site_name.clone(),
            site_url: config.site_url.clone(),
        }
    }

    /// Notification to the operator inbox. `None` when no inbox is configured.
    pub fn operator_notification(&self, submission: &Submission) -> Option<OutboundEmail> {
        let to = self.operator.clone()?;

        let mut fields = vec![("Name", submission.name.clone())];
        if let Some(email) = &submission.email {
            fields.push((
                "Email",
                format!(
                    "<a href=\"mailto:{0}\" style=\"color: #22d3ee;\">{0}</a>",
                    email
                ),
            ));
        }
        if let Some(whatsapp) = &submission.whatsapp {
            fields.push(("WhatsApp", whatsapp.clone()));
        }
        if !submission.company.is_empty() {
            fields.push(("Company", submission.company.clone()));
        }
        if let Some(country) = &submission.country {
            fields.push(("Country", country.clone()));
        }
        if let Some(challenge) = submission
            .challenge_label
            .as_ref()
            .or(submission.challenge.as_ref())
        {
            fields.push(("Challenge", challenge.clone()));
        }
        fields.push(("Message", submission.message.clone()));

        let rows: String = fields
            .iter()
            .map(|(label, value)| {
                format!(
                    "<div class=\"label\">{}</div><div class=\"value\">{}</div>",
                    label, value
                )
            })
            .collect();

        let html = page(&format!(
            "<div class=\"header\"><h1 style=\"margin: 0;\">New Lead!</h1>\
             <p style=\"margin: 5px 0 0 0;\">You have a new contact form submission</p></div>\
             <div class=\"content\">{rows}\
             <div class=\"footer\"><p>Submitted at: {at}</p><p>Source: {source} &middot; ID: {id}</p>\
             <p>This email was sent from your {site} website contact form.</p></div></div>",
            rows = rows,
            at = submission.submitted_at.format("%Y-%m-%d %H:%M:%S UTC"),
            source = submission.source,
            id = submission.id,
            site = self.site_name,
        ));

        Some(OutboundEmail {
            from: self.from.clone(),
            to: vec![to],
            subject: format!(
                "New Contact Form Submission from {}",
                unescape_html(&submission.name)
            ),
            html,
            reply_to: submission.email.as_deref().map(unescape_html),
        })
    }

    /// Thank-you message to the submitter. `None` when disabled or when the
    /// lead left no email address.
    pub fn confirmation(&self, submission: &Submission) -> Option<OutboundEmail> {
        if !self.send_confirmation {
            return None;
        }
        let to = unescape_html(submission.email.as_deref()?);

        let html = page(&format!(
            "<div class=\"header\" style=\"text-align: center;\"><h1 style=\"margin: 0;\">{site}</h1></div>\
             <div class=\"content\"><h2>Thank You, {name}!</h2>\
             <p>We've received your message and our team will get back to you within 24 hours.</p>\
             <p><strong>Your message:</strong></p><div class=\"value\">{message}</div>\
             <p style=\"text-align: center;\"><a href=\"{url}\">Visit Our Website</a></p>\
             <div class=\"footer\"><p><strong>{site}</strong></p></div></div>",
            site = self.site_name,
            name = submission.name,
            message = submission.message,
            url = self.site_url,
        ));

        Some(OutboundEmail {
            from: self.from.clone(),
            to: vec![to],
            subject: format!("Thank you for contacting {}!", self.site_name),
            html,
            reply_to: None,
        })
    }
}

fn page(body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><style>{}</style></head><body><div class=\"container\">{}</div></body></html>",
        STYLE, body
    )
}
