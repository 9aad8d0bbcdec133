#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ghsearch::data_models::SearchType;
use ghsearch::error::{Result, ScrapeError};
use ghsearch::manager::PageSource;
use reqwest::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const TEST_BASE_URL: &str = "http://github.test";

pub fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
}

pub const PYTHON_REPOS: [&str; 10] = [
    "https://github.com/kubernetes-client/python",
    "https://github.com/xxg1413/python",
    "https://github.com/gxcuizy/Python",
    "https://github.com/jakevdp/PythonDataScienceHandbook",
    "https://github.com/AtsushiSakai/PythonRobotics",
    "https://github.com/vinta/awesome-python",
    "https://github.com/Tanu-N-Prabhu/Python",
    "https://github.com/Pierian-Data/Complete-Python-3-Bootcamp",
    "https://github.com/poise/python",
    "https://github.com/yidao620c/python3-cookbook",
];

pub const DJANGO_REPOS: [&str; 10] = [
    "https://github.com/django/django",
    "https://github.com/liangliangyy/DjangoBlog",
    "https://github.com/encode/django-rest-framework",
    "https://github.com/django-cms/django-cms",
    "https://github.com/cookiecutter/cookiecutter-django",
    "https://github.com/pennersr/django-allauth",
    "https://github.com/django-oscar/django-oscar",
    "https://github.com/stephenmcd/mezzanine",
    "https://github.com/wsvincent/awesome-django",
    "https://github.com/sclorg/django-ex",
];

pub const ISSUE_URLS: [&str; 20] = [
    "https://github.com/ahmadabos/ahmed-abbous/issues/2",
    "https://github.com/CodeWithHarry/100-days-of-code-youtube/issues/15",
    "https://github.com/abdulraheem48/Course/issues/1",
    "https://github.com/Afwanshaik/Afwan-demo/issues/1",
    "https://github.com/SaiRupaViswanadh/BigDataBootCamp2.0/issues/1",
    "https://github.com/mouredev/Hello-Python/issues/61",
    "https://github.com/kevin2045/Trabalho-do-curso-/issues/1",
    "https://github.com/beomseok3/test/issues/2",
    "https://github.com/CodeStrong2023/BrigadaBinaria-tercer-semestre/issues/25",
    "https://github.com/Asabeneh/30-Days-Of-Python/issues/520",
    "https://github.com/SaidParaBellum/git/issues/1",
    "https://github.com/odundoB/IBL/issues/1",
    "https://github.com/muturi254/open_waters/issues/28",
    "https://github.com/jonas-rem/lwm2m_server/issues/12",
    "https://github.com/V-FOR-VEND3TTA/news-aggregator/issues/3",
    "https://github.com/amy-1989/the-bakery/issues/43",
    "https://github.com/ichinose9372/ft_transcendense_42/issues/69",
    "https://github.com/javieb/ProyectoFinal/issues/1",
    "https://github.com/abaddonpuff/commandCenter/issues/1",
    "https://github.com/kmmbvnr/django-guardian-ng/issues/104",
];

pub fn all_repo_urls() -> Vec<&'static str> {
    PYTHON_REPOS.iter().chain(DJANGO_REPOS.iter()).copied().collect()
}

/// In-memory page source that records every call it receives.
#[derive(Default)]
pub struct FakeSource {
    pub base_url: String,
    pub search_pages: HashMap<String, String>,
    pub repo_pages: HashMap<String, String>,
    pub failing_repo: Option<String>,
    pub search_calls: Mutex<Vec<(String, SearchType, String)>>,
    pub repo_calls: Mutex<Vec<(String, String)>>,
}

impl FakeSource {
    pub fn new() -> FakeSource {
        FakeSource {
            base_url: "https://github.com".to_string(),
            ..Default::default()
        }
    }

    pub fn with_search_page(mut self, keyword: &str, html: String) -> FakeSource {
        self.search_pages.insert(keyword.to_string(), html);
        self
    }

    pub fn with_repo_page(mut self, url: &str, html: String) -> FakeSource {
        self.repo_pages.insert(url.to_string(), html);
        self
    }

    pub fn failing_on_repo(mut self, url: &str) -> FakeSource {
        self.failing_repo = Some(url.to_string());
        self
    }

    pub fn search_calls(&self) -> Vec<(String, SearchType, String)> {
        self.search_calls.lock().unwrap().clone()
    }

    pub fn repo_calls(&self) -> Vec<(String, String)> {
        self.repo_calls.lock().unwrap().clone()
    }
}

fn not_found(url: &str) -> ScrapeError {
    ScrapeError::HttpStatus {
        url: url.to_string(),
        status: StatusCode::NOT_FOUND,
    }
}

impl PageSource for FakeSource {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_search_results_page(
        &self,
        query: &str,
        search_type: SearchType,
        proxy: &str,
    ) -> Result<String> {
        self.search_calls
            .lock()
            .unwrap()
            .push((query.to_string(), search_type, proxy.to_string()));
        self.search_pages
            .get(query)
            .cloned()
            .ok_or_else(|| not_found(query))
    }

    async fn get_repository_page(&self, repo_url: &str, proxy: &str) -> Result<String> {
        self.repo_calls
            .lock()
            .unwrap()
            .push((repo_url.to_string(), proxy.to_string()));
        if self.failing_repo.as_deref() == Some(repo_url) {
            return Err(ScrapeError::HttpStatus {
                url: repo_url.to_string(),
                status: StatusCode::INTERNAL_SERVER_ERROR,
            });
        }
        self.repo_pages
            .get(repo_url)
            .cloned()
            .ok_or_else(|| not_found(repo_url))
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub target: String,
    pub headers: HashMap<String, String>,
}

pub enum Reply {
    Status(u16, String),
    Hangup,
}

/// A forward proxy on localhost that answers from a closure instead of
/// contacting the target.
pub struct MockProxy {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
    pub connections: Arc<AtomicUsize>,
    pub max_in_flight: Arc<AtomicUsize>,
}

impl MockProxy {
    pub async fn start<F>(delay: Duration, reply: F) -> MockProxy
    where
        F: Fn(&RecordedRequest) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let reply = Arc::new(reply);

        let proxy = MockProxy {
            addr,
            requests: requests.clone(),
            connections: connections.clone(),
            max_in_flight: max_in_flight.clone(),
        };

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                connections.fetch_add(1, Ordering::SeqCst);
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(now, Ordering::SeqCst);

                let requests = requests.clone();
                let in_flight = in_flight.clone();
                let reply = reply.clone();
                tokio::spawn(async move {
                    let request = read_request(&mut socket).await;
                    tokio::time::sleep(delay).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);

                    let Some(request) = request else {
                        return;
                    };
                    requests.lock().unwrap().push(request.clone());
                    match reply(&request) {
                        Reply::Hangup => drop(socket),
                        Reply::Status(code, body) => {
                            let response = format!(
                                "HTTP/1.1 {code} Mock\r\ncontent-type: text/html; charset=utf-8\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                                body.len()
                            );
                            let _ = socket.write_all(response.as_bytes()).await;
                            let _ = socket.shutdown().await;
                        }
                    }
                });
            }
        });

        proxy
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// `host:port` without a scheme, as callers usually pass it.
    pub fn bare(&self) -> String {
        self.addr.to_string()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let head = String::from_utf8_lossy(&buf).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers = lines
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    Some(RecordedRequest {
        method,
        target,
        headers,
    })
}
