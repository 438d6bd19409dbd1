use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::instrument;

use crate::config::StoreConfig;
use crate::errors::{FeeError, Result};
use crate::payments::{PaymentReceipt, PaymentSubmission};
use crate::store::{FeeStructureResponse, FeeStructureStore, PaymentStore, PaymentSummary};
use crate::types::{AcademicPeriod, FeeItem};

/// REST client for the school api
#[derive(Debug, Clone)]
pub struct HttpStore {
    base_url: Url,
    client: Client,
}

impl HttpStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/')).map_err(|e| {
            FeeError::InvalidConfiguration {
                message: format!("invalid store url {}: {}", config.base_url, e),
            }
        })?;

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
                FeeError::InvalidConfiguration {
                    message: format!("invalid auth token: {}", e),
                }
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| FeeError::InvalidConfiguration {
                message: format!("cannot build http client: {}", e),
            })?;

        Ok(Self { base_url, client })
    }

    /// base url with `segments` appended, each percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FeeError::InvalidConfiguration {
                message: format!("store url cannot be a base: {}", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn with_period(mut url: Url, period: Option<AcademicPeriod>) -> Url {
        if let Some(period) = period {
            url.query_pairs_mut()
                .append_pair("term", period.term.label())
                .append_pair("year", &period.year_label());
        }
        url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        let endpoint = url.path().to_string();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeeError::StoreUnavailable {
                status: status.as_u16(),
                endpoint,
            });
        }
        response.json::<T>().await.map_err(|e| FeeError::Decode {
            message: format!("{}: {}", endpoint, e),
        })
    }
}

#[async_trait]
impl FeeStructureStore for HttpStore {
    #[instrument(name = "store_fee_structures", skip(self))]
    async fn fee_structures(
        &self,
        class_name: &str,
        period: Option<AcademicPeriod>,
    ) -> Result<Vec<FeeItem>> {
        let url = Self::with_period(self.endpoint(&["fee-structures", class_name])?, period);
        let body: FeeStructureResponse = self.get_json(url).await?;
        Ok(body.fee_structures)
    }
}

#[async_trait]
impl PaymentStore for HttpStore {
    #[instrument(name = "store_payment_summary", skip(self))]
    async fn payment_summary(
        &self,
        student_id: &str,
        period: Option<AcademicPeriod>,
    ) -> Result<PaymentSummary> {
        let url = Self::with_period(self.endpoint(&["payments", "summary", student_id])?, period);
        self.get_json(url).await
    }

    #[instrument(name = "store_process_payment", skip(self, submission), fields(student_id = %submission.student_id))]
    async fn process_payment(&self, submission: &PaymentSubmission) -> Result<PaymentReceipt> {
        let url = self.endpoint(&["payments", "process"])?;
        let response = self.client.post(url).json(submission).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FeeError::PaymentRejected {
                status: status.as_u16(),
                message,
            });
        }

        let mut receipt: PaymentReceipt = response.json().await.map_err(|e| FeeError::Decode {
            message: format!("payment receipt: {}", e),
        })?;
        if receipt.reference.is_empty() {
            receipt.reference = submission.payment_reference.clone();
        }
        if receipt.amount.is_zero() {
            receipt.amount = submission.amount;
        }
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;
    use crate::payments::PaymentMethod;
    use crate::types::Term;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_for(server: &MockServer) -> HttpStore {
        HttpStore::new(&StoreConfig {
            base_url: format!("{}/api", server.uri()),
            timeout_secs: 5,
            auth_token: Some("secret".to_string()),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fee_structures_filtered_by_period() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/fee-structures/S.1"))
            .and(query_param("term", "Term 1"))
            .and(query_param("year", "2025"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "feeStructures": [
                    {"id": "f1", "feeName": "Tuition", "amount": 800000, "frequency": "termly", "term": "Term 1", "year": "2025"},
                    {"id": "f2", "name": "Lunch", "amount": "50000", "frequency": "termly", "term": "Term 1", "year": "2025"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let items = store_for(&server)
            .fee_structures("S.1", Some(AcademicPeriod::new(Term::Term1, 2025)))
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[1].fee_name, "Lunch");
        assert_eq!(items[1].amount, Money::from_major(50_000));
    }

    #[tokio::test]
    async fn test_class_name_is_path_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/fee-structures/Senior%201"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"feeStructures": []})))
            .expect(1)
            .mount(&server)
            .await;

        let items = store_for(&server).fee_structures("Senior 1", None).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_maps_to_store_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = store_for(&server).fee_structures("S.1", None).await.unwrap_err();
        assert!(matches!(err, FeeError::StoreUnavailable { status: 500, .. }));
        assert!(err.is_store_failure());
    }

    #[tokio::test]
    async fn test_malformed_body_maps_to_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = store_for(&server).payment_summary("STU-1", None).await.unwrap_err();
        assert!(matches!(err, FeeError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_payment_summary_reads_financial_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/payments/summary/STU-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "totalPaid": 999999,
                "totalFeesRequired": 850000,
                "paymentBreakdown": [{"billingType": "Tuition", "paid": 800000}],
                "financialRecords": [
                    {"studentId": "STU-1", "type": "payment", "billingType": "Tuition", "amount": 800000, "status": "paid", "term": "Term 1", "year": "2025"}
                ]
            })))
            .mount(&server)
            .await;

        let summary = store_for(&server).payment_summary("STU-1", None).await.unwrap();
        assert_eq!(summary.financial_records.len(), 1);
        assert_eq!(summary.total_paid, Money::from_major(999_999));
        assert_eq!(summary.payment_breakdown[0].paid, Money::from_major(800_000));
    }

    #[tokio::test]
    async fn test_process_payment_posts_submission() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/payments/process"))
            .and(body_partial_json(json!({
                "studentId": "STU-1",
                "billingType": "Tuition",
                "paymentMethod": "bank",
                "paymentReference": "BANK-1"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"paymentId": "p-77"})))
            .expect(1)
            .mount(&server)
            .await;

        let submission = PaymentSubmission::new("STU-1", Money::from_major(100_000), "Tuition", PaymentMethod::Bank)
            .reference("BANK-1");
        let receipt = store_for(&server).process_payment(&submission).await.unwrap();

        assert_eq!(receipt.payment_id, "p-77");
        assert_eq!(receipt.reference, "BANK-1");
        assert_eq!(receipt.amount, Money::from_major(100_000));
    }

    #[tokio::test]
    async fn test_rejected_payment_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("duplicate reference"))
            .mount(&server)
            .await;

        let submission = PaymentSubmission::new("STU-1", Money::from_major(1), "Tuition", PaymentMethod::Cash);
        let err = store_for(&server).process_payment(&submission).await.unwrap_err();

        match err {
            FeeError::PaymentRejected { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "duplicate reference");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_invalid_base_url() {
        let config = StoreConfig {
            base_url: "::nope::".to_string(),
            ..StoreConfig::default()
        };
        assert!(HttpStore::new(&config).is_err());
    }
}
