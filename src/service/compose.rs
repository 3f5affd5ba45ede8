use std::fmt::Write;

use anyhow::Context;

use url::Url;

use crate::client::Email;
use crate::domain::EmailAddress;
use crate::model::Deal;

const FOOTER_STYLE: &str = "font-size:12px;color:#64748b;margin-top:20px";

/// Builds the subject and bodies of every email the service sends
#[derive(Debug, Clone)]
pub struct Composer {
    site_name: String,
    site_url: Url,
    unsubscribe_url: Url,
}

impl Composer {
    pub fn new(base_url: Url, site_name: impl Into<String>) -> anyhow::Result<Self> {
        let mut site_url = base_url;
        if !site_url.path().ends_with('/') {
            let path = format!("{}/", site_url.path());
            site_url.set_path(&path);
        }

        let unsubscribe_url = site_url
            .join("api/unsubscribe")
            .context("Failed to create unsubscribe URL")?;

        Ok(Self {
            site_name: site_name.into(),
            site_url,
            unsubscribe_url,
        })
    }

    pub fn site_url(&self) -> &Url {
        &self.site_url
    }

    /// Personal one-click unsubscribe link
    pub fn unsubscribe_link(&self, recipient: &EmailAddress) -> Url {
        let mut url = self.unsubscribe_url.clone();
        url.query_pairs_mut()
            .append_pair("email", recipient.as_ref());
        url
    }

    pub fn welcome_subject(&self) -> String {
        format!("Welcome to {}", self.site_name)
    }

    pub fn welcome(&self, recipient: &EmailAddress) -> Email {
        let unsubscribe = self.unsubscribe_link(recipient);
        let site_name = escape_html(&self.site_name);

        let html_body = format!(
            "<h2>Welcome to {site_name}</h2>\
             <p>You will receive curated UK flight deals as they drop.</p>\
             <p>Meanwhile, browse the latest here: <a href=\"{site}\">Open site</a></p>\
             <hr/>\
             <p style=\"{FOOTER_STYLE}\">You can unsubscribe anytime: <a href=\"{unsubscribe}\">Unsubscribe</a></p>",
            site = escape_html(self.site_url.as_str()),
            unsubscribe = escape_html(unsubscribe.as_str()),
        );
        let text_body = format!(
            "Welcome to {}!\n\nYou will receive curated UK flight deals as they drop.\n\
             Browse the latest here: {}\n\nUnsubscribe: {}",
            self.site_name, self.site_url, unsubscribe
        );

        Email {
            recipient: recipient.clone(),
            subject: self.welcome_subject(),
            html_body,
            text_body,
        }
    }

    /// `£<price> <ORIG> → <DEST> (<trip type>)`
    pub fn deal_alert_subject(&self, deal: &Deal) -> String {
        format!(
            "{} {} → {} ({})",
            deal.price_gbp, deal.origin_airport, deal.destination_airport, deal.trip_type
        )
    }

    pub fn deal_alert(&self, deal: &Deal, recipient: &EmailAddress) -> Email {
        let unsubscribe = self.unsubscribe_link(recipient);
        let tracked = deal.link.tracked(&deal.id.to_string());
        let airline = deal.airline.as_deref().unwrap_or("Airline TBC");
        let dates = deal
            .outbound_dates
            .as_deref()
            .unwrap_or("Flexible / multiple");

        let html_body = format!(
            "<h2>New UK flight deal</h2>\
             <p><strong>Route:</strong> {origin} → {destination}</p>\
             <p><strong>Price:</strong> {price} · {airline}</p>\
             <p><strong>Dates:</strong> {dates}</p>\
             <p><a href=\"{link}\">Open deal</a></p>\
             <hr/>\
             <p style=\"{FOOTER_STYLE}\">You are receiving this because you subscribed to {site_name}. \
             <a href=\"{unsubscribe}\">Unsubscribe</a></p>",
            origin = deal.origin_airport,
            destination = deal.destination_airport,
            price = deal.price_gbp,
            airline = escape_html(airline),
            dates = escape_html(dates),
            link = escape_html(tracked.as_str()),
            site_name = escape_html(&self.site_name),
            unsubscribe = escape_html(unsubscribe.as_str()),
        );
        let text_body = format!(
            "New UK flight deal\n\nRoute: {} → {}\nPrice: {} · {}\nDates: {}\nOpen deal: {}\n\n\
             Unsubscribe: {}",
            deal.origin_airport,
            deal.destination_airport,
            deal.price_gbp,
            airline,
            dates,
            tracked,
            unsubscribe
        );

        Email {
            recipient: recipient.clone(),
            subject: self.deal_alert_subject(deal),
            html_body,
            text_body,
        }
    }

    pub fn digest_subject(&self) -> String {
        format!("Your weekly {}", self.site_name)
    }

    /// One composite email listing `deals` in the given order
    pub fn digest(&self, deals: &[Deal], recipient: &EmailAddress) -> Email {
        let unsubscribe = self.unsubscribe_link(recipient);

        let mut html_items = String::new();
        let mut text_items = String::new();
        for (position, deal) in deals.iter().enumerate() {
            let tracked = deal.link.tracked(&deal.id.to_string());
            let dates = deal
                .outbound_dates
                .as_deref()
                .map(|dates| format!(" · {}", dates))
                .unwrap_or_default();

            // writing into a String never fails
            let _ = write!(
                html_items,
                "<li><strong>{}</strong> {} → {}{} · <a href=\"{}\">Open</a></li>",
                deal.price_gbp,
                deal.origin_airport,
                deal.destination_airport,
                escape_html(&dates),
                escape_html(tracked.as_str()),
            );
            let _ = writeln!(
                text_items,
                "{}. {} {} → {}{}\n   {}",
                position + 1,
                deal.price_gbp,
                deal.origin_airport,
                deal.destination_airport,
                dates,
                tracked,
            );
        }

        let html_body = format!(
            "<div style=\"font-family:system-ui,sans-serif;line-height:1.5;color:#111\">\
             <h2>Weekly {site_name}</h2>\
             <p>The cheapest deals from the last 7 days.</p>\
             <ol>{html_items}</ol>\
             <p>Prices move fast, book before they take off.</p>\
             <p style=\"{FOOTER_STYLE}\">You are receiving this because you subscribed to {site_name}. \
             <a href=\"{unsubscribe}\">Unsubscribe</a></p>\
             </div>",
            site_name = escape_html(&self.site_name),
            unsubscribe = escape_html(unsubscribe.as_str()),
        );
        let text_body = format!(
            "Weekly {}\n\nThe cheapest deals from the last 7 days.\n\n{}\nUnsubscribe: {}",
            self.site_name, text_items, unsubscribe
        );

        Email {
            recipient: recipient.clone(),
            subject: self.digest_subject(),
            html_body,
            text_body,
        }
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
