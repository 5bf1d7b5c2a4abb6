//! Integration tests for the typed feed operations, driven by canned
//! in-process handlers

use std::collections::HashMap;

use crouke::{
    Client, Credentials, ErrorKind, Feed, Handler, RawResponse, Request, Result, SortMode, Verb,
    Vote,
};

/// Handler serving canned bodies by request path
#[derive(Default)]
struct RouteHandler {
    routes: HashMap<String, (u16, String)>,
}

impl RouteHandler {
    fn route(mut self, path: &str, body: &str) -> Self {
        self.routes
            .insert(path.to_string(), (200, body.to_string()));
        self
    }

    fn route_status(mut self, path: &str, status: u16, body: &str) -> Self {
        self.routes
            .insert(path.to_string(), (status, body.to_string()));
        self
    }
}

impl Handler for RouteHandler {
    fn name(&self) -> &str {
        "routes"
    }

    fn call(&self, request: &Request) -> Result<RawResponse> {
        let path = request
            .url
            .find("/V1/")
            .and_then(|at| request.url.get(at..))
            .unwrap_or_default();
        let (status, body) = self
            .routes
            .get(path)
            .cloned()
            .unwrap_or((404, String::new()));
        Ok(RawResponse {
            status,
            headers: Vec::new(),
            body: body.into_bytes(),
        })
    }
}

fn feed_with(handler: RouteHandler) -> Feed {
    let mut client = Client::bare(&Credentials::new("user", "password"), "server.example.org");
    client.register_handler(Verb::Get, Box::new(handler));
    Feed::new(client)
}

const CATEGORIES_OK: &str = "<ocs><status>ok</status><data>\
     <category id=\"2\">Icons</category>\
     <category id=\"1\">Wallpapers</category>\
   </data></ocs>";

fn entry_xml(id: u32, changed: i64, name: &str, score: i64, downloads: i64) -> String {
    format!(
        "<entry><id>{id}</id><changed>{changed}</changed><name>{name}</name>\
         <score>{score}</score><downloads>{downloads}</downloads></entry>"
    )
}

fn list_ok(entries: &[String]) -> String {
    format!(
        "<ocs><status>ok</status><data>{}</data></ocs>",
        entries.concat()
    )
}

#[test]
fn test_categories() -> Result<()> {
    let feed = feed_with(RouteHandler::default().route("/V1/CATEGORIES/", CATEGORIES_OK));
    let categories = feed.categories()?;
    let pairs: Vec<_> = categories
        .iter()
        .map(|c| (c.id.as_str(), c.name.as_str()))
        .collect();
    // Document order, no client-side re-sort of categories.
    assert_eq!(pairs, vec![("2", "Icons"), ("1", "Wallpapers")]);
    Ok(())
}

#[test]
fn test_categories_non_ok_status_is_empty() -> Result<()> {
    let feed = feed_with(RouteHandler::default().route(
        "/V1/CATEGORIES/",
        "<ocs><status>failed</status></ocs>",
    ));
    assert!(feed.categories()?.is_empty());
    Ok(())
}

#[test]
fn test_list_new_sorts_ascending_by_changed() -> Result<()> {
    let body = list_ok(&[
        entry_xml(1, 300, "c", 0, 0),
        entry_xml(2, 100, "a", 0, 0),
        entry_xml(3, 200, "b", 0, 0),
    ]);
    let feed = feed_with(RouteHandler::default().route("/V1/LIST/1x2/new/0", &body));

    let entries = feed.list(&["1", "2"], SortMode::New, 0)?;
    let changed: Vec<_> = entries.iter().map(|e| e.changed).collect();
    assert_eq!(changed, vec![100, 200, 300]);

    let ids = feed.list_ids(&["1", "2"], SortMode::New, 0)?;
    assert_eq!(ids, vec!["2", "3", "1"]);
    Ok(())
}

#[test]
fn test_list_single_entry_still_listed() -> Result<()> {
    // One <entry> objectifies as a single node; the feed layer must not
    // assume list cardinality.
    let body = list_ok(&[entry_xml(9, 50, "only", 1, 2)]);
    let feed = feed_with(RouteHandler::default().route("/V1/LIST/7/new/0", &body));
    let entries = feed.list(&["7"], SortMode::New, 0)?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, "9");
    Ok(())
}

#[test]
fn test_list_missing_field_is_explicit() {
    let body = "<ocs><status>ok</status><data>\
         <entry><id>1</id><name>x</name></entry></data></ocs>";
    let feed = feed_with(RouteHandler::default().route("/V1/LIST/1/new/0", body));
    let err = feed.list(&["1"], SortMode::New, 0).unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::MissingField {
            field: "changed".to_string()
        }
    );
}

#[test]
fn test_list_non_numeric_field_is_explicit() {
    let body = "<ocs><status>ok</status><data>\
         <entry><id>1</id><changed>soon</changed><name>x</name>\
         <score>0</score><downloads>0</downloads></entry></data></ocs>";
    let feed = feed_with(RouteHandler::default().route("/V1/LIST/1/new/0", body));
    let err = feed.list(&["1"], SortMode::New, 0).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::InvalidNumber);
}

#[test]
fn test_content_decodes_percent_escapes() -> Result<()> {
    let body = "<ocs><status>ok</status><data>\
         <downloadlink>http%3A%2F%2Fx.example%2Ftheme.tar.gz</downloadlink>\
         <description>A%20nice%20theme</description>\
         <homepage/>\
       </data></ocs>";
    let feed = feed_with(RouteHandler::default().route("/V1/GET/42/", body));

    let details = feed.content("42")?;
    assert_eq!(
        details.get("downloadlink").cloned().flatten().as_deref(),
        Some("http://x.example/theme.tar.gz")
    );
    assert_eq!(
        details.get("description").cloned().flatten().as_deref(),
        Some("A nice theme")
    );
    // Present but empty element: key exists, no text.
    assert_eq!(details.get("homepage"), Some(&None));
    let keys: Vec<_> = details.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["downloadlink", "description", "homepage"]);
    Ok(())
}

#[test]
fn test_vote_returns_status_verbatim() -> Result<()> {
    let feed = feed_with(
        RouteHandler::default()
            .route("/V1/VOTE/42/good", "<ocs><status>ok</status><data/></ocs>")
            .route("/V1/VOTE/42/bad", "<ocs><status>rejected</status></ocs>"),
    );
    assert_eq!(feed.vote("42", Vote::Good)?, "ok");
    assert_eq!(feed.vote("42", Vote::Bad)?, "rejected");
    Ok(())
}

#[test]
fn test_verify_login_checks_status_only() -> Result<()> {
    let ok = feed_with(RouteHandler::default().route("/V1/CATEGORIES/", "anything"));
    assert!(ok.verify_login()?);

    let denied = feed_with(RouteHandler::default().route_status(
        "/V1/CATEGORIES/",
        401,
        "denied",
    ));
    assert!(!denied.verify_login()?);
    Ok(())
}

#[test]
fn test_front_page_fetches_sequentially() -> Result<()> {
    let list_body = list_ok(&[entry_xml(5, 10, "b", 0, 0), entry_xml(6, 5, "a", 0, 0)]);
    let content5 = "<ocs><status>ok</status><data><name>b</name></data></ocs>";
    let content6 = "<ocs><status>ok</status><data><name>a</name></data></ocs>";
    let feed = feed_with(
        RouteHandler::default()
            .route("/V1/CATEGORIES/", CATEGORIES_OK)
            .route("/V1/LIST/2x1/new/0", &list_body)
            .route("/V1/GET/5/", content5)
            .route("/V1/GET/6/", content6),
    );

    let page = feed.front_page(SortMode::New, 0)?;
    assert_eq!(page.categories.len(), 2);
    // Entries re-sorted ascending by changed, so content 6 comes first.
    assert_eq!(page.contents.len(), 2);
    assert_eq!(
        page.contents[0].get("name").cloned().flatten().as_deref(),
        Some("a")
    );
    Ok(())
}

#[test]
fn test_unexpected_status_propagates_from_feed() {
    let feed = feed_with(RouteHandler::default().route_status(
        "/V1/CATEGORIES/",
        503,
        "overloaded",
    ));
    let err = feed.categories().unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::UnexpectedStatus { code: 503 });
}
