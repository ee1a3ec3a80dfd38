use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::models::{BookingDetails, ChangeEvent, Client, ClientQuery};

use super::range::TimeRange;
use super::sse::SseDecoder;
use super::ClientError;

/// Where a calendar gets its bookings and client suggestions from.
#[async_trait]
pub trait BookingSource: Send + Sync {
    async fn fetch_range(&self, range: &TimeRange) -> Result<Vec<BookingDetails>, ClientError>;

    async fn find_similar_clients(&self, query: &ClientQuery) -> Result<Vec<Client>, ClientError>;
}

pub struct HttpBookingSource {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl HttpBookingSource {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Open the change feed. Events arrive on the returned stream until
    /// `cancel` fires, the server closes the connection, or a frame fails to
    /// decode (yielded as the last item).
    pub async fn subscribe(
        &self,
        cancel: CancellationToken,
    ) -> Result<ReceiverStream<Result<ChangeEvent, ClientError>>, ClientError> {
        let resp = self
            .client
            .get(self.url("/api/bookings/stream"))
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            let mut body = Box::pin(resp.bytes_stream());
            let mut decoder = SseDecoder::new();
            loop {
                let chunk = tokio::select! {
                    _ = cancel.cancelled() => break,
                    chunk = body.next() => chunk,
                };
                let chunk = match chunk {
                    Some(Ok(chunk)) => chunk,
                    Some(Err(e)) => {
                        let _ = tx.send(Err(ClientError::Http(e))).await;
                        break;
                    }
                    None => {
                        tracing::info!("change feed closed by server");
                        break;
                    }
                };
                for frame in decoder.push(&chunk) {
                    let item = serde_json::from_str::<ChangeEvent>(&frame.data)
                        .map_err(|e| ClientError::Decode(e.to_string()));
                    let failed = item.is_err();
                    if tx.send(item).await.is_err() || failed {
                        return;
                    }
                }
            }
        });

        Ok(ReceiverStream::new(rx))
    }
}

#[async_trait]
impl BookingSource for HttpBookingSource {
    async fn fetch_range(&self, range: &TimeRange) -> Result<Vec<BookingDetails>, ClientError> {
        tracing::debug!(%range, "fetching bookings");
        let resp = self
            .client
            .get(self.url("/api/bookings/range"))
            .bearer_auth(&self.token)
            .query(&[("start", wire_time(range.start)), ("end", wire_time(range.end))])
            .send()
            .await?;
        decode(resp).await
    }

    async fn find_similar_clients(&self, query: &ClientQuery) -> Result<Vec<Client>, ClientError> {
        let resp = self
            .client
            .post(self.url("/api/clients/find-similar"))
            .bearer_auth(&self.token)
            .json(query)
            .send()
            .await?;
        decode(resp).await
    }
}

fn wire_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body: serde_json::Value = resp.json().await.unwrap_or_default();
    Err(ClientError::Status {
        status: status.as_u16(),
        message: body["error"].as_str().unwrap_or("request failed").to_string(),
    })
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let resp = check_status(resp).await?;
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_time_keeps_millis_and_z() {
        let t = DateTime::parse_from_rfc3339("2024-03-31T21:59:59.999Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(wire_time(t), "2024-03-31T21:59:59.999Z");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let source = HttpBookingSource::new("http://localhost:3000/", "t");
        assert_eq!(source.url("/api/bookings"), "http://localhost:3000/api/bookings");
    }
}
