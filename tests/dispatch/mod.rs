//! Test organization:
//! - end_to_end.rs: reads, mutations and failures through the full stack
//! - settings.rs: building a dispatcher from serialized settings

mod end_to_end;

use futures::future::{ready, Ready};
use http::{Method, Request, Response, StatusCode};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// In-memory student roster served over `http` types.
///
/// - `GET /students` lists names, comma separated
/// - `POST /students` adds the request body as a name
/// - any request is answered with a queued failure status first, if one is
///   pending
#[derive(Clone, Default)]
pub(crate) struct Backend {
    students: Arc<Mutex<Vec<String>>>,
    failures: Arc<Mutex<VecDeque<u16>>>,
    requests: Arc<AtomicUsize>,
    tokens: Arc<Mutex<Vec<Option<String>>>>,
}

impl Backend {
    pub(crate) fn with_students(names: &[&str]) -> Self {
        let backend = Self::default();
        backend
            .students
            .lock()
            .unwrap()
            .extend(names.iter().map(|name| name.to_string()));
        backend
    }

    pub(crate) fn fail_next(&self, statuses: &[u16]) {
        self.failures.lock().unwrap().extend(statuses);
    }

    pub(crate) fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub(crate) fn tokens(&self) -> Vec<Option<String>> {
        self.tokens.lock().unwrap().clone()
    }
}

impl Service<Request<String>> for Backend {
    type Response = Response<String>;
    type Error = std::io::Error;
    type Future = Ready<Result<Response<String>, std::io::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<String>) -> Self::Future {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().unwrap().push(
            req.headers()
                .get(http::header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned),
        );

        if let Some(status) = self.failures.lock().unwrap().pop_front() {
            return ready(Ok(respond(status, String::new())));
        }

        let response = match (req.method(), req.uri().path()) {
            (&Method::GET, "/students") => respond(200, self.students.lock().unwrap().join(",")),
            (&Method::POST, "/students") => {
                self.students.lock().unwrap().push(req.into_body());
                respond(201, String::new())
            }
            _ => respond(404, String::new()),
        };
        ready(Ok(response))
    }
}

fn respond(status: u16, body: String) -> Response<String> {
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
    response
}

/// Routes component logs to the test harness output.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .with_test_writer()
        .try_init();
}

pub(crate) fn list_students() -> Request<String> {
    Request::get("/students").body(String::new()).unwrap()
}

pub(crate) fn create_student(name: &'static str) -> impl Fn() -> Request<String> + Send + 'static {
    move || Request::post("/students").body(name.to_string()).unwrap()
}
