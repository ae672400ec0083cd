// src/server/handler.rs
use hyper::{Body, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;
use tower::Service;

use crate::server::routes::GameService;

/// tower adapter around [`GameService`]. Routing errors are already turned
/// into JSON responses, so the service itself never fails.
#[derive(Clone)]
pub struct RequestHandler {
    service: Arc<GameService>,
}

impl RequestHandler {
    pub fn new(service: Arc<GameService>) -> Self {
        Self { service }
    }
}

impl Service<Request<Body>> for RequestHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let service = self.service.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}
