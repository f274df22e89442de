use std::io::{Cursor, Read as _};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bookpack::app::artifact_store::LocalDirSink;
use bookpack::app::progress::{Progress, ProgressSink};
use bookpack::app::{BookService, StartOutcome};
use bookpack::config::JobConfig;
use bookpack::epub::ZipArchiveBuilder;
use bookpack::fetch::{HttpFetcher, HttpFetcherOptions};
use url::Url;

mod backend_stub;

use backend_stub::{BOOK_ID, BackendStub, COVER_JPG, FIG_PNG, sample_book};

#[derive(Default)]
struct RecordingProgress {
    reports: Mutex<Vec<Progress>>,
}

impl RecordingProgress {
    fn reports(&self) -> Vec<Progress> {
        self.reports.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn report(&self, progress: Progress) {
        self.reports.lock().unwrap().push(progress);
    }
}

fn service(
    stub: &BackendStub,
    out: &std::path::Path,
    interval: Duration,
) -> (BookService, Arc<RecordingProgress>) {
    let config = JobConfig {
        origin: Url::parse(&stub.base_url).unwrap(),
        interval,
        ..JobConfig::default()
    };
    let fetcher = HttpFetcher::new(&HttpFetcherOptions {
        user_agent: "bookpack-tests".to_owned(),
        cookie: Some("session=test".to_owned()),
        timeout: Some(Duration::from_secs(10)),
    })
    .unwrap();
    let progress = Arc::new(RecordingProgress::default());
    let service = BookService::new(
        config,
        Arc::new(fetcher),
        Arc::new(ZipArchiveBuilder),
        progress.clone(),
        Arc::new(LocalDirSink::new(out, false)),
    );
    (service, progress)
}

fn read_entry(zip: &mut zip::ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    zip.by_name(name)
        .unwrap_or_else(|err| panic!("missing {name}: {err}"))
        .read_to_end(&mut out)
        .unwrap();
    out
}

#[tokio::test]
async fn saves_complete_epub_for_book_page() -> anyhow::Result<()> {
    let stub = BackendStub::spawn(sample_book(3));
    let temp = tempfile::tempdir()?;
    let (service, progress) = service(&stub, temp.path(), Duration::from_millis(5));

    let outcome = service.start(&stub.page_url()).await?;
    let path = temp.path().join("some-book.epub");
    assert_eq!(outcome, StartOutcome::Saved(path.clone()));
    assert!(!service.is_busy());

    let mut zip = zip::ZipArchive::new(Cursor::new(std::fs::read(&path)?))?;
    assert_eq!(zip.by_index(0)?.name(), "mimetype");
    assert_eq!(read_entry(&mut zip, "mimetype"), b"application/epub+zip");
    assert_eq!(read_entry(&mut zip, "OEBPS/cover-image.jpg"), COVER_JPG);
    assert_eq!(read_entry(&mut zip, "OEBPS/assets/fig1.png"), FIG_PNG);

    let page = String::from_utf8(read_entry(&mut zip, "OEBPS/ch02.html"))?;
    assert!(page.contains("<title>Chapter 2 &amp; more</title>"));
    assert!(page.contains("<h1>Chapter 2</h1><hr/><p>text<br/>more</p><img src=\"fig1.png\"/>"));

    let ncx = String::from_utf8(read_entry(&mut zip, "OEBPS/toc.ncx"))?;
    assert!(ncx.contains("isbn:42"));
    assert!(ncx.contains("A. Writer, B. Editor"));
    assert!(ncx.contains("<content src=\"ch01.html\"/>"));

    let opf = String::from_utf8(read_entry(&mut zip, "OEBPS/content.opf"))?;
    assert!(opf.contains("urn:isbn:42"));
    assert!(opf.contains("Stub Press"));
    assert!(opf.contains("<itemref idref=\"ch03\"/>"));

    let reports = progress.reports();
    assert_eq!(reports.first(), Some(&Progress::Percent(0)));
    assert_eq!(
        &reports[reports.len() - 3..],
        &[Progress::Percent(100), Progress::Indeterminate, Progress::Idle]
    );
    let percents = reports
        .iter()
        .filter_map(|p| match p {
            Progress::Percent(n) => Some(*n),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{percents:?}");

    assert!(
        stub.requests()
            .contains(&format!("/nest/epub/toc/?book_id={BOOK_ID}"))
    );
    Ok(())
}

#[tokio::test]
async fn missing_resource_fails_without_saving() -> anyhow::Result<()> {
    let mut routes = sample_book(2);
    routes.remove(&format!("/library/cover/{BOOK_ID}/720h/"));
    let stub = BackendStub::spawn(routes);
    let temp = tempfile::tempdir()?;
    let (service, progress) = service(&stub, temp.path(), Duration::ZERO);

    let err = service.start(&stub.page_url()).await.unwrap_err();
    let err = err
        .downcast_ref::<bookpack::Error>()
        .unwrap_or_else(|| panic!("expected bookpack::Error, got {err:#}"));
    assert_eq!(err.status_code(), Some(404));

    assert_eq!(std::fs::read_dir(temp.path())?.count(), 0);
    assert_eq!(progress.reports().last(), Some(&Progress::Idle));
    assert!(!service.is_busy());
    Ok(())
}

#[tokio::test]
async fn malformed_page_descriptor_is_reported() -> anyhow::Result<()> {
    let mut routes = sample_book(1);
    routes.insert(
        format!("/api/v1/book/{BOOK_ID}/chapter/ch01/"),
        b"<html>not json</html>".to_vec(),
    );
    let stub = BackendStub::spawn(routes);
    let temp = tempfile::tempdir()?;
    let (service, _) = service(&stub, temp.path(), Duration::ZERO);

    let err = service.start(&stub.page_url()).await.unwrap_err();
    assert!(
        matches!(
            err.downcast_ref::<bookpack::Error>(),
            Some(bookpack::Error::MalformedDescriptor { .. })
        ),
        "{err:#}"
    );
    Ok(())
}

#[tokio::test]
async fn non_book_pages_never_start_a_job() -> anyhow::Result<()> {
    let stub = BackendStub::spawn(sample_book(1));
    let temp = tempfile::tempdir()?;
    let (service, progress) = service(&stub, temp.path(), Duration::ZERO);

    for url in [
        format!("{}/home/", stub.base_url),
        format!("{}/library/view/some-book/42", stub.base_url),
        "https://elsewhere.test/library/view/some-book/42/".to_owned(),
    ] {
        assert_eq!(service.start(&url).await?, StartOutcome::NotABookPage, "{url}");
    }
    assert!(stub.requests().is_empty());
    assert!(progress.reports().is_empty());
    Ok(())
}

#[tokio::test]
async fn concurrent_start_is_dropped_while_busy() -> anyhow::Result<()> {
    let stub = BackendStub::spawn(sample_book(2));
    let temp = tempfile::tempdir()?;
    let (service, _) = service(&stub, temp.path(), Duration::from_millis(20));
    let page_url = stub.page_url();

    let (first, second) = tokio::join!(service.start(&page_url), service.start(&page_url));
    assert!(matches!(first?, StartOutcome::Saved(_)));
    assert_eq!(second?, StartOutcome::Busy);

    let toc_requests = stub
        .requests()
        .iter()
        .filter(|target| target.starts_with("/nest/epub/toc/"))
        .count();
    assert_eq!(toc_requests, 1);
    Ok(())
}
