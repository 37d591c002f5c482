use std::convert::Infallible;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::header::CONTENT_TYPE;
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use log::{error, info};
use serde::Deserialize;
use tokio_stream::wrappers::UnboundedReceiverStream;

use skin_serve::generate::DEFAULT_SUBJECT;
use skin_serve::{
    handle, ClientConfig, GenerateConfig, HttpReply, SkinClassifier, TextGenerator, TokenSource,
    UploadedImage, DEFAULT_GENERATE_ENDPOINT, DEFAULT_MODEL_ENDPOINT,
};

struct Service {
    classifier: SkinClassifier,
    generator: TextGenerator,
}

#[derive(Deserialize, Default)]
struct GenerateParams {
    subject: Option<String>,
}

async fn route(req: Request<Body>, service: Arc<Service>) -> Result<Response<Body>, Infallible> {
    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/") => into_response(HttpReply::liveness()),
        (&Method::POST, "/") => classify(req, &service).await,
        (&Method::POST, "/generate") => generate(req, &service).await,
        _ => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::from("Not found"))
            .expect("failed to render response"),
    };

    Ok(response)
}

async fn classify(req: Request<Body>, service: &Service) -> Response<Body> {
    let (parts, body) = req.into_parts();
    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let upload = UploadedImage::from_multipart(content_type.as_deref(), body).await;
    let reply = handle(upload, &service.classifier).await;

    into_response(reply)
}

/// Streams the menu-suggestion flow back as a chunked plaintext body. If
/// the caller disconnects, the response channel closes and the generator
/// stops pulling from the model.
async fn generate(req: Request<Body>, service: &Service) -> Response<Body> {
    let bytes = hyper::body::to_bytes(req.into_body())
        .await
        .unwrap_or_default();
    let params: GenerateParams = serde_json::from_slice(&bytes).unwrap_or_default();
    let subject = params.subject.unwrap_or_else(|| DEFAULT_SUBJECT.to_owned());

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Result<String, Infallible>>();
    let generator = service.generator.clone();

    tokio::spawn(async move {
        let sink = move |fragment: &str| tx.send(Ok(fragment.to_owned())).is_ok();
        match generator.suggest_menu_item(&subject, sink).await {
            Ok(full) => info!("generation finished ({} chars)", full.len()),
            Err(err) => error!("generation failed: {}", err),
        }
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/plain")
        .body(Body::wrap_stream(UnboundedReceiverStream::new(rx)))
        .expect("failed to render response")
}

fn into_response(reply: HttpReply) -> Response<Body> {
    Response::builder()
        .status(reply.status)
        .header(CONTENT_TYPE, reply.content_type)
        .body(Body::from(reply.body))
        .expect("failed to render response")
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(8080);
    let model_endpoint =
        env::var("MODEL_ENDPOINT").unwrap_or_else(|_| DEFAULT_MODEL_ENDPOINT.to_owned());
    let generate_endpoint =
        env::var("GENERATE_ENDPOINT").unwrap_or_else(|_| DEFAULT_GENERATE_ENDPOINT.to_owned());

    let classifier = SkinClassifier::new(
        ClientConfig::new(model_endpoint),
        TokenSource::from_default_env(),
    )
    .expect("failed to build the prediction client");
    let generator = TextGenerator::new(
        GenerateConfig::new(generate_endpoint),
        TokenSource::from_default_env(),
    )
    .expect("failed to build the generation client");

    let service = Arc::new(Service {
        classifier,
        generator,
    });

    let make_service = make_service_fn(move |_conn: &AddrStream| {
        let service = Arc::clone(&service);

        let svc = service_fn(move |req| route(req, service.clone()));

        async move { Ok::<_, Infallible>(svc) }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("listening on {}", addr);

    let server = Server::bind(&addr).serve(make_service);

    if let Err(err) = server.await {
        eprintln!("server error: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> Arc<Service> {
        // Loopback endpoints: the routes under test never reach the network.
        let token = TokenSource::Fixed("test-token".to_owned());
        Arc::new(Service {
            classifier: SkinClassifier::new(ClientConfig::new("http://127.0.0.1:9/"), token.clone())
                .unwrap(),
            generator: TextGenerator::new(GenerateConfig::new("http://127.0.0.1:9/"), token)
                .unwrap(),
        })
    }

    #[tokio::test]
    async fn get_root_answers_the_liveness_banner() {
        let req = Request::builder()
            .method(Method::GET)
            .uri("/")
            .body(Body::empty())
            .unwrap();

        let response = route(req, test_service()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(body, skin_serve::LIVENESS_BANNER.as_bytes());
    }

    #[tokio::test]
    async fn post_without_a_file_is_a_400() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/")
            .body(Body::empty())
            .unwrap();

        let response = route(req, test_service()).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&body).unwrap(),
            serde_json::json!({ "error": "No image uploaded" })
        );
    }

    #[tokio::test]
    async fn unknown_routes_are_404() {
        let req = Request::builder()
            .method(Method::GET)
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();

        let response = route(req, test_service()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
