use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Outbound guest email. Each variant carries its recipient and the facts
/// the message renders.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    BookingConfirmed {
        to: String,
        villa: String,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: i32,
        phone: String,
        price: Decimal,
    },
    BookingCancelled {
        to: String,
        villa: String,
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
    CancellationCode {
        to: String,
        code: u32,
        ttl_seconds: u64,
    },
    RegistrationCode {
        to: String,
        code: u32,
        ttl_seconds: u64,
    },
}

impl Notification {
    pub fn recipient(&self) -> &str {
        match self {
            Notification::BookingConfirmed { to, .. }
            | Notification::BookingCancelled { to, .. }
            | Notification::CancellationCode { to, .. }
            | Notification::RegistrationCode { to, .. } => to,
        }
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::BookingConfirmed { .. } => "booking_confirmed",
            Notification::BookingCancelled { .. } => "booking_cancelled",
            Notification::CancellationCode { .. } => "cancellation_code",
            Notification::RegistrationCode { .. } => "registration_code",
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            Notification::BookingConfirmed { .. } => "Your villa booking is confirmed",
            Notification::BookingCancelled { .. } => "Your villa booking has been cancelled",
            Notification::CancellationCode { .. } => "Confirm your booking cancellation",
            Notification::RegistrationCode { .. } => "Verify your email address",
        }
    }

    pub fn text_body(&self) -> String {
        match self {
            Notification::BookingConfirmed { villa, check_in, check_out, guests, phone, price, .. } => format!(
                "Your booking at {} is confirmed.\n\nCheck-in: {}\nCheck-out: {}\nGuests: {}\nPhone: {}\nTotal price: {}\n",
                villa, check_in, check_out, guests, phone, price
            ),
            Notification::BookingCancelled { villa, check_in, check_out, .. } => format!(
                "Your booking at {} from {} to {} has been cancelled.\n",
                villa, check_in, check_out
            ),
            Notification::CancellationCode { code, ttl_seconds, .. } => format!(
                "Your cancellation code is {}. It expires in {} seconds.\n",
                code, ttl_seconds
            ),
            Notification::RegistrationCode { code, ttl_seconds, .. } => format!(
                "Your verification code is {}. It expires in {} seconds.\n",
                code, ttl_seconds
            ),
        }
    }

    pub fn html_body(&self) -> String {
        match self {
            Notification::BookingConfirmed { villa, check_in, check_out, guests, phone, price, .. } => format!(
                r#"<html><body>
<h2>Booking confirmed</h2>
<p>Your booking at <strong>{}</strong> is confirmed.</p>
<table>
<tr><td>Check-in</td><td>{}</td></tr>
<tr><td>Check-out</td><td>{}</td></tr>
<tr><td>Guests</td><td>{}</td></tr>
<tr><td>Phone</td><td>{}</td></tr>
<tr><td>Total price</td><td>{}</td></tr>
</table>
</body></html>"#,
                villa, check_in, check_out, guests, phone, price
            ),
            Notification::BookingCancelled { villa, check_in, check_out, .. } => format!(
                "<html><body><h2>Booking cancelled</h2><p>Your booking at <strong>{}</strong> from {} to {} has been cancelled.</p></body></html>",
                villa, check_in, check_out
            ),
            Notification::CancellationCode { code, ttl_seconds, .. }
            | Notification::RegistrationCode { code, ttl_seconds, .. } => format!(
                r#"<html><body>
<p>Use the following code:</p>
<h1 style="text-align: center; letter-spacing: 5px;">{}</h1>
<p>This code expires in {} seconds.</p>
</body></html>"#,
                code, ttl_seconds
            ),
        }
    }
}

/// Delivery channel for guest emails (SMTP, console, test recorder).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        notification: &Notification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_renders_summary() {
        let n = Notification::BookingConfirmed {
            to: "guest@example.com".to_string(),
            villa: "Cliff House".to_string(),
            check_in: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2024, 6, 12).unwrap(),
            guests: 3,
            phone: "+15550100".to_string(),
            price: Decimal::new(450, 0),
        };

        let body = n.text_body();
        assert!(body.contains("Cliff House"));
        assert!(body.contains("2024-06-10"));
        assert!(body.contains("Guests: 3"));
        assert!(body.contains("+15550100"));
        assert!(body.contains("450"));
        assert_eq!(n.recipient(), "guest@example.com");
        assert_eq!(n.kind(), "booking_confirmed");
    }

    #[test]
    fn test_code_email_mentions_ttl() {
        let n = Notification::CancellationCode {
            to: "guest@example.com".to_string(),
            code: 123456,
            ttl_seconds: 30,
        };
        assert!(n.text_body().contains("123456"));
        assert!(n.html_body().contains("30 seconds"));
    }
}
