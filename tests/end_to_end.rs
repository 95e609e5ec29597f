use rusqlite::Connection;

use rad_scraper::db;
use rad_scraper::parser::extract::{CategoryMarker, Extractor};
use rad_scraper::pipeline::{run_scrapers, PersistCounts};
use rad_scraper::sources::fetch::StaticFetcher;
use rad_scraper::sources::html_pages::{howard_brown, HtmlPageScraper};
use rad_scraper::sources::Scraper;
use rad_scraper::upsert::UpdatePolicy;

const PAGE_URL: &str = "http://example.org/listing";

fn listing(description: &str) -> String {
    format!(
        r##"<html><body><div id="main">
        <font color="#000000">Clinics</font>
        <a href="http://example.org/clinic"><strong>Example Clinic</strong></a> {}
        </div></body></html>"##,
        description
    )
}

fn scrapers() -> Vec<Box<dyn Scraper>> {
    let marker = CategoryMarker::new("font", "color", "#00000").unwrap();
    let scraper = HtmlPageScraper::new(
        "div#main",
        Extractor::new("Example Source", marker),
        vec![PAGE_URL.to_string()],
    )
    .unwrap();
    vec![Box::new(scraper)]
}

fn description(conn: &Connection) -> String {
    conn.query_row("SELECT description FROM resources", [], |r| r.get(0))
        .unwrap()
}

#[test]
fn rescrape_respects_update_policy() {
    let conn = db::connect_in_memory().unwrap();
    let scrapers = scrapers();
    let original = StaticFetcher::new().with_page(PAGE_URL, listing("Open weekdays."));

    let first = run_scrapers(&conn, &scrapers, &original, None, UpdatePolicy::Lazy).unwrap();
    assert_eq!(first.sources[0].persisted.created, 1);
    let second = run_scrapers(&conn, &scrapers, &original, None, UpdatePolicy::Lazy).unwrap();
    assert_eq!(
        second.sources[0].persisted,
        PersistCounts { created: 0, updated: 0, unchanged: 1 }
    );

    let stats = db::get_stats(&conn).unwrap();
    assert_eq!((stats.resources, stats.categories, stats.links), (1, 1, 1));
    assert_eq!(description(&conn), "Open weekdays.");

    let changed = StaticFetcher::new().with_page(PAGE_URL, listing("Now open weekends."));
    run_scrapers(&conn, &scrapers, &changed, None, UpdatePolicy::Lazy).unwrap();
    assert_eq!(description(&conn), "Open weekdays.");

    run_scrapers(&conn, &scrapers, &changed, None, UpdatePolicy::Eager).unwrap();
    assert_eq!(description(&conn), "Now open weekends.");
    assert_eq!(db::get_stats(&conn).unwrap().resources, 1);
}

#[test]
fn unreachable_targets_are_reported_not_fatal() {
    let conn = db::connect_in_memory().unwrap();
    let scraper = howard_brown(&[2722, 2706], 10).unwrap();
    let fetcher = StaticFetcher::new().with_page(
        "http://www.howardbrown.org/hb_services.asp?id=2722",
        include_str!("fixtures/howardbrown.html"),
    );
    let scrapers: Vec<Box<dyn Scraper>> = vec![Box::new(scraper)];

    let report = run_scrapers(&conn, &scrapers, &fetcher, None, UpdatePolicy::Lazy).unwrap();
    let s = &report.sources[0];
    assert_eq!((s.targets, s.fetched), (2, 1));
    assert_eq!(s.failures.len(), 1);
    assert!(s.failures[0].target.ends_with("id=2706"));
    assert_eq!(s.persisted.created, 3);
    assert_eq!(s.rejected, 1);

    let stats = db::get_stats(&conn).unwrap();
    assert_eq!(stats.by_source, vec![("Howard Brown".to_string(), 3)]);
}
