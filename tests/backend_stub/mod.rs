#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

pub const BOOK_SLUG: &str = "some-book";
pub const BOOK_ID: &str = "42";

pub static COVER_JPG: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
pub static FIG_PNG: &[u8] = &[137, 80, 78, 71, 13, 10, 26, 10, 0, 0, 0, 13];

/// Request target (path plus query) to response body. Anything else is a 404.
pub type Routes = HashMap<String, Vec<u8>>;

pub struct BackendStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl BackendStub {
    pub fn spawn(routes: Routes) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start backend stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let target = request.url().to_string();
                seen.lock().expect("request log lock").push(target.clone());

                let response = match routes.get(&target) {
                    Some(body) => tiny_http::Response::from_data(body.clone()),
                    None => tiny_http::Response::from_string("not found").with_status_code(404),
                };
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn page_url(&self) -> String {
        format!("{}/library/view/{BOOK_SLUG}/{BOOK_ID}/ch01.html", self.base_url)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("request log lock").clone()
    }
}

impl Drop for BackendStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// A book with `chapters` top-level chapters; the first one has a section and
/// an image.
pub fn sample_book(chapters: usize) -> Routes {
    let mut items = Vec::new();
    let mut routes = Routes::new();
    let mut order = 0;

    for n in 1..=chapters {
        order += 1;
        let name = format!("ch{n:02}");
        items.push(serde_json::json!({
            "depth": 1,
            "order": order,
            "id": name,
            "href": format!("{name}.html"),
            "media_type": "application/xhtml+xml",
            "label": format!("Chapter {n}"),
            "url": format!("/api/v1/book/{BOOK_ID}/chapter/{name}/"),
        }));
        let images: &[&str] = if n == 1 {
            &["../graphics/fig1.png"]
        } else {
            &[]
        };
        routes.insert(
            format!("/api/v1/book/{BOOK_ID}/chapter/{name}/"),
            serde_json::json!({
                "content": format!("/api/v1/book/{BOOK_ID}/chapter-content/{name}.html"),
                "full_path": format!("{name}.html"),
                "title": format!("Chapter {n} & more"),
                "images": images,
            })
            .to_string()
            .into_bytes(),
        );
        routes.insert(
            format!("/api/v1/book/{BOOK_ID}/chapter-content/{name}.html"),
            format!("<h1>Chapter&nbsp;{n}</h1><hr><p>text<br>more</p><img src=\"fig1.png\">")
                .into_bytes(),
        );

        if n == 1 {
            order += 1;
            items.push(serde_json::json!({
                "depth": 2,
                "order": order,
                "id": "ch01s01",
                "href": "ch01.html#s01",
                "media_type": "application/xhtml+xml",
                "label": "Section 1.1",
                "url": format!("/api/v1/book/{BOOK_ID}/chapter/ch01/"),
            }));
        }
    }

    routes.insert(
        format!("/nest/epub/toc/?book_id={BOOK_ID}"),
        serde_json::json!({
            "book_id": BOOK_ID,
            "title": "Some Book",
            "authors": ["A. Writer", "B. Editor"],
            "publisher": { "name": "Stub Press" },
            "pub_date": "2015-01-01",
            "items": items,
        })
        .to_string()
        .into_bytes(),
    );
    routes.insert(
        format!("/library/view/{BOOK_SLUG}/graphics/fig1.png"),
        FIG_PNG.to_vec(),
    );
    routes.insert(
        format!("/library/cover/{BOOK_ID}/720h/"),
        COVER_JPG.to_vec(),
    );
    routes
}
