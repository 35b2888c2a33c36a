//! RLP gateway stream factory.
//!
//! Subscriptions go to `GET <endpoint>/v2/read?shard_id=<id>&<selector>...` and
//! come back as server-sent events whose data frames carry `{"batch": [...]}`.
//! Connecting is deferred to the first pull.

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use reqwest::header::{HeaderValue, ACCEPT, CACHE_CONTROL};
use reqwest::{Method, Url};
use std::sync::Arc;
use tracing::{debug, info};

use crate::app::ports::{EnvelopeStream, RequestTransport, StreamFactory, StreamPull, TokenSource};
use crate::config::GatewayConfig;
use crate::constants;
use crate::domain::{Envelope, EnvelopeBatch, TelemetryKind};
use crate::error::StreamError;
use crate::infra::authorizing_transport::AuthorizingTransport;
use crate::infra::http_client::{build_client, ReqwestTransport};
use crate::infra::sse::{SseDecoder, SseEvent};

pub struct GatewayStreamFactory {
    transport: Arc<dyn RequestTransport>,
    read_url: Url,
    shard_id: String,
}

impl GatewayStreamFactory {
    pub fn new(
        endpoint: &str,
        shard_id: &str,
        transport: Arc<dyn RequestTransport>,
    ) -> Result<Self, StreamError> {
        let raw = format!("{}{}", endpoint.trim_end_matches('/'), constants::RLP_READ_PATH);
        let read_url = Url::parse(&raw)
            .map_err(|e| StreamError::Request(format!("endpoint '{}': {}", endpoint, e)))?;
        Ok(Self {
            transport,
            read_url,
            shard_id: shard_id.to_string(),
        })
    }

    /// Build the HTTP client from the gateway's TLS settings and wrap it so every
    /// request is authorized through `tokens`. Fails only on client construction.
    pub fn from_config(
        config: &GatewayConfig,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, StreamError> {
        let client = build_client(&config.tls, None)?;
        let transport = AuthorizingTransport::new(tokens, ReqwestTransport::new(client));
        Self::new(&config.endpoint, &config.shard_id, Arc::new(transport))
    }

    pub fn subscription_url(&self, kind: TelemetryKind) -> Url {
        let mut url = self.read_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("shard_id", &kind.shard_id(&self.shard_id));
            for selector in kind.selectors() {
                query.append_key_only(selector.query_flag());
            }
        }
        url
    }
}

#[async_trait]
impl StreamFactory for GatewayStreamFactory {
    async fn create_stream(
        &self,
        kind: TelemetryKind,
    ) -> Result<Box<dyn EnvelopeStream>, StreamError> {
        let url = self.subscription_url(kind);
        if kind.selectors().is_empty() {
            info!(
                %kind,
                "subscription carries no selectors; the gateway will deliver no envelopes"
            );
        }
        debug!(%kind, shard_id = %kind.shard_id(&self.shard_id), %url, "creating envelope stream");
        Ok(Box::new(GatewayEnvelopeStream::new(self.transport.clone(), url, kind)))
    }
}

enum Phase {
    Pending,
    Open(BoxStream<'static, Result<Vec<u8>, reqwest::Error>>),
    Done,
}

enum EventOutcome {
    Batch(Vec<Envelope>),
    Skip,
    Closing,
}

pub struct GatewayEnvelopeStream {
    transport: Arc<dyn RequestTransport>,
    url: Url,
    kind: TelemetryKind,
    phase: Phase,
    decoder: SseDecoder,
}

impl GatewayEnvelopeStream {
    fn new(transport: Arc<dyn RequestTransport>, url: Url, kind: TelemetryKind) -> Self {
        Self {
            transport,
            url,
            kind,
            phase: Phase::Pending,
            decoder: SseDecoder::new(),
        }
    }

    fn finish(&mut self, pull: StreamPull) -> StreamPull {
        self.phase = Phase::Done;
        self.decoder = SseDecoder::new();
        pull
    }
}

async fn connect(
    transport: Arc<dyn RequestTransport>,
    url: Url,
    kind: TelemetryKind,
) -> Result<BoxStream<'static, Result<Vec<u8>, reqwest::Error>>, StreamError> {
    let mut request = reqwest::Request::new(Method::GET, url);
    request
        .headers_mut()
        .insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
    request.headers_mut().insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    let resp = transport.execute(request).await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(StreamError::Status { status: status.as_u16() });
    }
    debug!(%kind, status = status.as_u16(), "envelope stream connected");
    Ok(resp.bytes_stream().map(|chunk| chunk.map(|b| b.to_vec())).boxed())
}

fn decode_event(event: SseEvent) -> Result<EventOutcome, StreamError> {
    match event.event.as_deref() {
        Some(constants::SSE_EVENT_HEARTBEAT) => Ok(EventOutcome::Skip),
        Some(constants::SSE_EVENT_CLOSING) => Ok(EventOutcome::Closing),
        Some(name) if !name.is_empty() => {
            debug!(event = name, "ignoring unrecognized SSE event");
            Ok(EventOutcome::Skip)
        }
        _ if event.data.trim().is_empty() => Ok(EventOutcome::Skip),
        _ => {
            let batch: EnvelopeBatch = serde_json::from_str(&event.data)?;
            if batch.batch.is_empty() {
                Ok(EventOutcome::Skip)
            } else {
                Ok(EventOutcome::Batch(batch.batch))
            }
        }
    }
}

#[async_trait]
impl EnvelopeStream for GatewayEnvelopeStream {
    async fn next_batch(&mut self) -> StreamPull {
        if matches!(self.phase, Phase::Done) {
            return StreamPull::Closed;
        }
        if matches!(self.phase, Phase::Pending) {
            match connect(self.transport.clone(), self.url.clone(), self.kind).await {
                Ok(body) => self.phase = Phase::Open(body),
                Err(e) => return self.finish(StreamPull::Failed(e)),
            }
        }

        loop {
            while let Some(event) = self.decoder.next_event() {
                match decode_event(event) {
                    Ok(EventOutcome::Batch(batch)) => return StreamPull::Batch(batch),
                    Ok(EventOutcome::Skip) => {}
                    Ok(EventOutcome::Closing) => {
                        debug!(kind = %self.kind, "gateway announced stream closing");
                        return self.finish(StreamPull::Closed);
                    }
                    Err(e) => return self.finish(StreamPull::Failed(e)),
                }
            }

            let body = match &mut self.phase {
                Phase::Open(body) => body,
                _ => return StreamPull::Closed,
            };
            let chunk = body.next().await;
            match chunk {
                Some(Ok(bytes)) => {
                    if let Err(e) = self.decoder.push(&bytes) {
                        let err = StreamError::Framing(e.to_string());
                        return self.finish(StreamPull::Failed(err));
                    }
                }
                Some(Err(e)) => {
                    return self.finish(StreamPull::Failed(StreamError::Transport(e.into())));
                }
                None => return self.finish(StreamPull::Closed),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    struct RefusingTransport;

    #[async_trait]
    impl RequestTransport for RefusingTransport {
        async fn execute(
            &self,
            _request: reqwest::Request,
        ) -> Result<reqwest::Response, TransportError> {
            Err(TransportError::AuthorizationFailed)
        }
    }

    fn factory() -> GatewayStreamFactory {
        GatewayStreamFactory::new(
            "https://log-stream.example.com/",
            "opentelemetry",
            Arc::new(RefusingTransport),
        )
        .unwrap()
    }

    #[test]
    fn test_subscription_url_per_kind() {
        let factory = factory();
        assert_eq!(
            factory.subscription_url(TelemetryKind::Metrics).as_str(),
            "https://log-stream.example.com/v2/read?shard_id=opentelemetry_metrics&counter&gauge"
        );
        assert_eq!(
            factory.subscription_url(TelemetryKind::Logs).as_str(),
            "https://log-stream.example.com/v2/read?shard_id=opentelemetry_logs&log"
        );
        assert_eq!(
            factory.subscription_url(TelemetryKind::Traces).as_str(),
            "https://log-stream.example.com/v2/read?shard_id=opentelemetry_traces"
        );
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let transport = Arc::new(RefusingTransport);
        assert!(GatewayStreamFactory::new("not a url", "shard", transport).is_err());
    }

    #[tokio::test]
    async fn test_stream_is_lazy_and_terminal_after_failure() {
        let mut stream = factory().create_stream(TelemetryKind::Logs).await.unwrap();

        match stream.next_batch().await {
            StreamPull::Failed(StreamError::Transport(TransportError::AuthorizationFailed)) => {}
            other => panic!("expected authorization failure, got {:?}", other),
        }
        assert!(matches!(stream.next_batch().await, StreamPull::Closed));
    }

    fn open_stream(chunks: Vec<String>) -> GatewayEnvelopeStream {
        let mut stream = GatewayEnvelopeStream::new(
            Arc::new(RefusingTransport),
            Url::parse("https://log-stream.example.com/v2/read").unwrap(),
            TelemetryKind::Metrics,
        );
        let body = futures::stream::iter(
            chunks.into_iter().map(|c| Ok::<_, reqwest::Error>(c.into_bytes())),
        );
        stream.phase = Phase::Open(body.boxed());
        stream
    }

    const COUNTER_FRAME: &str = concat!(
        "data: {\"batch\":[{\"sourceId\":\"app\",",
        "\"counter\":{\"name\":\"c\",\"total\":\"1\"}}]}\n\n"
    );

    #[tokio::test]
    async fn test_events_after_closing_are_discarded() {
        let chunk = format!("event: closing\ndata: bye\n\n{}", COUNTER_FRAME);
        let mut stream = open_stream(vec![chunk]);

        assert!(matches!(stream.next_batch().await, StreamPull::Closed));
        assert!(matches!(stream.next_batch().await, StreamPull::Closed));
    }

    #[tokio::test]
    async fn test_events_after_malformed_frame_are_discarded() {
        let chunk = format!("data: {{not json\n\n{}", COUNTER_FRAME);
        let mut stream = open_stream(vec![chunk, COUNTER_FRAME.to_string()]);

        assert!(matches!(stream.next_batch().await, StreamPull::Failed(StreamError::Decode(_))));
        assert!(matches!(stream.next_batch().await, StreamPull::Closed));
    }

    #[tokio::test]
    async fn test_batches_then_end_of_body() {
        let mut stream = open_stream(vec![
            COUNTER_FRAME.to_string(),
            "event: heartbeat\ndata: 1\n\n".to_string(),
        ]);

        assert!(matches!(stream.next_batch().await, StreamPull::Batch(b) if b.len() == 1));
        assert!(matches!(stream.next_batch().await, StreamPull::Closed));
    }

    #[test]
    fn test_decode_event_variants() {
        let heartbeat = SseEvent { event: Some("heartbeat".into()), data: "1".into() };
        assert!(matches!(decode_event(heartbeat), Ok(EventOutcome::Skip)));

        let closing = SseEvent { event: Some("closing".into()), data: String::new() };
        assert!(matches!(decode_event(closing), Ok(EventOutcome::Closing)));

        let empty = SseEvent { event: None, data: r#"{"batch":[]}"#.into() };
        assert!(matches!(decode_event(empty), Ok(EventOutcome::Skip)));

        let data = SseEvent {
            event: None,
            data: r#"{"batch":[{"sourceId":"app","counter":{"name":"c","total":"1"}}]}"#.into(),
        };
        match decode_event(data) {
            Ok(EventOutcome::Batch(batch)) => assert_eq!(batch.len(), 1),
            _ => panic!("expected a batch"),
        }

        let garbage = SseEvent { event: None, data: "{not json".into() };
        assert!(matches!(decode_event(garbage), Err(StreamError::Decode(_))));
    }
}
