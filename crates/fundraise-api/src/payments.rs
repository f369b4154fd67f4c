use anyhow::{anyhow, bail};
use url::Url;
use uuid::Uuid;

/// Produces the URL a backer is sent to in order to pay a pledge.
///
/// The checkout itself is handled elsewhere; this service only stores the URL
/// and later receives the outcome as a payment notification.
pub trait PaymentLinks: Send + Sync {
    fn payment_url(&self, code: &str, amount: i64, payer_email: &str) -> anyhow::Result<String>;
}

/// Hosted-checkout links of the form `{base_url}/{code}?amount=..&email=..`.
pub struct CheckoutLinks {
    base_url: Url,
}

impl CheckoutLinks {
    pub fn new(base_url: Url) -> anyhow::Result<Self> {
        if base_url.cannot_be_a_base() {
            bail!("Payment base URL {} cannot carry a path", base_url);
        }
        Ok(Self { base_url })
    }
}

impl PaymentLinks for CheckoutLinks {
    fn payment_url(&self, code: &str, amount: i64, payer_email: &str) -> anyhow::Result<String> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Payment base URL {} cannot carry a path", self.base_url))?
            .pop_if_empty()
            .push(code);
        url.query_pairs_mut()
            .append_pair("amount", &amount.to_string())
            .append_pair("email", payer_email);
        Ok(url.into())
    }
}

/// Unique, unguessable order code for a new transaction.
pub fn new_transaction_code() -> String {
    format!("TRX-{}", Uuid::new_v4().simple()).to_uppercase()
}
