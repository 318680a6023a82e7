//! Email template rendering engine.
//!
//! Every template key has an HTML variant (`<key>_html`) and a plain-text
//! variant (`<key>_text`) used as the alternative body.

use crate::error::{NotificationError, NotificationResult};
use handlebars::Handlebars;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Rendered email content.
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    /// HTML body content.
    pub html: String,
    /// Plain text body content.
    pub text: String,
}

/// Turns a template key and its data into an email body.
pub trait ContentRenderer: Send + Sync {
    fn render(&self, template: &str, data: &Value) -> NotificationResult<RenderedEmail>;
}

/// Handlebars template engine with the built-in mail templates registered.
pub struct TemplateEngine {
    handlebars: Arc<Handlebars<'static>>,
}

impl TemplateEngine {
    /// Create a new template engine with all templates registered.
    pub fn new() -> NotificationResult<Self> {
        let mut handlebars = Handlebars::new();
        // a missing field is a bug in the data, not an empty string
        handlebars.set_strict_mode(true);

        let templates = [
            ("order_created_html", ORDER_CREATED_HTML_TEMPLATE),
            ("order_created_text", ORDER_CREATED_TEXT_TEMPLATE),
            ("email_verification_html", EMAIL_VERIFICATION_HTML_TEMPLATE),
            ("email_verification_text", EMAIL_VERIFICATION_TEXT_TEMPLATE),
            ("change_password_html", CHANGE_PASSWORD_HTML_TEMPLATE),
            ("change_password_text", CHANGE_PASSWORD_TEXT_TEMPLATE),
        ];
        for (name, source) in templates {
            handlebars
                .register_template_string(name, source)
                .map_err(|e| NotificationError::TemplateError(format!("Failed to register {}: {}", name, e)))?;
        }

        Ok(Self {
            handlebars: Arc::new(handlebars),
        })
    }

    pub fn has_template(&self, template: &str) -> bool {
        self.handlebars.has_template(&format!("{template}_html"))
            && self.handlebars.has_template(&format!("{template}_text"))
    }
}

impl ContentRenderer for TemplateEngine {
    fn render(&self, template: &str, data: &Value) -> NotificationResult<RenderedEmail> {
        if !self.has_template(template) {
            return Err(NotificationError::TemplateError(format!("unknown template '{template}'")));
        }
        debug!(template = %template, "Rendering email");

        let html = self.handlebars.render(&format!("{template}_html"), data)?;
        let text = self.handlebars.render(&format!("{template}_text"), data)?;
        Ok(RenderedEmail { html, text })
    }
}

// ============================================================================
// Email Templates
// ============================================================================

const ORDER_CREATED_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Your tickets</title>
</head>
<body style="margin: 0; padding: 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background-color: #f4f4f5;">
  <table role="presentation" width="100%" cellspacing="0" cellpadding="0" style="max-width: 600px; margin: 0 auto; padding: 40px 20px;">
    <tr>
      <td style="background-color: #ffffff; border-radius: 8px; padding: 40px; box-shadow: 0 2px 4px rgba(0,0,0,0.1);">
        <h1 style="color: #18181b; font-size: 24px; font-weight: 600; margin: 0 0 16px 0; text-align: center;">
          {{screening.movie_name}}
        </h1>
        <table width="100%" cellspacing="0" cellpadding="0" style="margin-bottom: 24px;">
          <tr>
            <td width="160" valign="top">
              <img src="{{screening.movie_poster_url}}" alt="{{screening.movie_name}}" width="140" style="display: block; border-radius: 6px;">
            </td>
            <td valign="top" style="color: #52525b; font-size: 14px; line-height: 22px;">
              <p style="margin: 0 0 8px 0;"><strong>{{screening.start_date}}</strong> at <strong>{{screening.start_time}}</strong></p>
              <p style="margin: 0 0 8px 0;">{{screening.cinema.name}}, {{screening.hall_name}}</p>
              <p style="margin: 0;">{{screening.cinema.address}}</p>
            </td>
          </tr>
        </table>
        <table width="100%" cellspacing="0" cellpadding="0" style="border-top: 1px solid #e4e4e7; padding-top: 24px;">
          <tr>
            <td style="text-align: center;">
              <p style="color: #71717a; font-size: 12px; margin: 0 0 8px 0;">Order {{order_id}}</p>
              <img src="data:{{{qr_mime_type}}};base64,{{order_id_qr}}" alt="{{order_id}}" width="200" height="200">
            </td>
          </tr>
        </table>
        {{#each tickets}}
        <table width="100%" cellspacing="0" cellpadding="0" style="margin-top: 24px; background-color: #f4f4f5; border-radius: 6px; padding: 16px;">
          <tr>
            <td valign="top" style="color: #18181b; font-size: 14px; line-height: 22px;">
              <p style="margin: 0 0 4px 0;"><strong>Ticket {{id}}</strong></p>
              <p style="margin: 0 0 4px 0;">Row {{row}}, seat {{seat}}</p>
              <p style="margin: 0;">Price: {{price}}</p>
            </td>
            <td width="120" style="text-align: right;">
              <img src="data:{{{@root.qr_mime_type}}};base64,{{id_qr}}" alt="{{id}}" width="110" height="110">
            </td>
          </tr>
        </table>
        {{/each}}
        <p style="color: #71717a; font-size: 12px; text-align: center; margin: 32px 0 0 0;">
          Show the codes at the entrance to the hall.
        </p>
      </td>
    </tr>
  </table>
</body>
</html>"#;

const ORDER_CREATED_TEXT_TEMPLATE: &str = r#"{{{screening.movie_name}}}

{{screening.start_date}} at {{screening.start_time}}
{{{screening.cinema.name}}}, {{{screening.hall_name}}}
{{{screening.cinema.address}}}

Order {{{order_id}}}
{{#each tickets}}
- Ticket {{{id}}}: row {{row}}, seat {{seat}}, price {{price}}
{{/each}}

Show the codes from the HTML version of this email at the entrance to the hall."#;

const EMAIL_VERIFICATION_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Confirm your email address</title>
</head>
<body style="margin: 0; padding: 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background-color: #f4f4f5;">
  <table role="presentation" width="100%" cellspacing="0" cellpadding="0" style="max-width: 600px; margin: 0 auto; padding: 40px 20px;">
    <tr>
      <td style="background-color: #ffffff; border-radius: 8px; padding: 40px; box-shadow: 0 2px 4px rgba(0,0,0,0.1);">
        <h1 style="color: #18181b; font-size: 24px; font-weight: 600; margin: 0 0 16px 0; text-align: center;">
          Confirm your email address
        </h1>
        <p style="color: #52525b; font-size: 16px; line-height: 24px; margin: 0 0 24px 0; text-align: center;">
          Follow the link below to confirm this address belongs to you.
        </p>
        <table width="100%" cellspacing="0" cellpadding="0">
          <tr>
            <td style="text-align: center;">
              <a href="{{url}}" style="display: inline-block; background-color: #2563eb; color: #ffffff; font-size: 16px; font-weight: 500; padding: 12px 32px; text-decoration: none; border-radius: 6px;">
                Confirm email
              </a>
            </td>
          </tr>
        </table>
        <p style="color: #71717a; font-size: 12px; text-align: center; margin: 16px 0 0 0;">
          This link expires in {{ttl}}.
        </p>
      </td>
    </tr>
  </table>
</body>
</html>"#;

const EMAIL_VERIFICATION_TEXT_TEMPLATE: &str = r#"Confirm your email address

Follow the link below to confirm this address belongs to you:
{{{url}}}

This link expires in {{ttl}}."#;

const CHANGE_PASSWORD_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Password change</title>
</head>
<body style="margin: 0; padding: 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background-color: #f4f4f5;">
  <table role="presentation" width="100%" cellspacing="0" cellpadding="0" style="max-width: 600px; margin: 0 auto; padding: 40px 20px;">
    <tr>
      <td style="background-color: #ffffff; border-radius: 8px; padding: 40px; box-shadow: 0 2px 4px rgba(0,0,0,0.1);">
        <h1 style="color: #18181b; font-size: 24px; font-weight: 600; margin: 0 0 16px 0; text-align: center;">
          Password change
        </h1>
        <p style="color: #52525b; font-size: 16px; line-height: 24px; margin: 0 0 24px 0; text-align: center;">
          Someone asked to change the password of your account. If it was you, follow the link below.
        </p>
        <table width="100%" cellspacing="0" cellpadding="0">
          <tr>
            <td style="text-align: center;">
              <a href="{{url}}" style="display: inline-block; background-color: #dc2626; color: #ffffff; font-size: 16px; font-weight: 500; padding: 12px 32px; text-decoration: none; border-radius: 6px;">
                Change password
              </a>
            </td>
          </tr>
        </table>
        <p style="color: #71717a; font-size: 12px; text-align: center; margin: 16px 0 0 0;">
          This link expires in {{ttl}}. If you did not ask for this, ignore this email.
        </p>
      </td>
    </tr>
  </table>
</body>
</html>"#;

const CHANGE_PASSWORD_TEXT_TEMPLATE: &str = r#"Password change

Someone asked to change the password of your account. If it was you, follow this link:
{{{url}}}

This link expires in {{ttl}}. If you did not ask for this, ignore this email."#;
