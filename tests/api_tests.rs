use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use game_store::api::AppState;
use game_store::config::Config;
use game_store::domain::RecordId;
use game_store::models::GameInput;
use http_body_util::BodyExt;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "game-store-test-boundary";

struct TestApp {
    state: Arc<AppState>,
    router: Router,
    dir: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

struct Page {
    status: StatusCode,
    location: Option<String>,
    body: String,
}

async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

async fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let dir = std::env::temp_dir().join(format!("game-store-api-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();

    let mut config = Config::default();
    config.general.database_url = format!("sqlite:{}", dir.join("store.db").display());
    config.general.images_path = dir.join("images").display().to_string();
    config.observability.metrics_enabled = false;
    configure(&mut config);

    let state = game_store::api::create_app_state_from_config(config, None)
        .await
        .expect("failed to create app state");
    let router = game_store::api::router(state.clone());

    TestApp { state, router, dir }
}

impl TestApp {
    fn images_dir(&self) -> PathBuf {
        self.dir.join("images")
    }

    async fn send(&self, request: Request<Body>) -> Page {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let body = response.into_body().collect().await.unwrap().to_bytes();
        Page {
            status,
            location,
            body: String::from_utf8_lossy(&body).into_owned(),
        }
    }

    async fn get(&self, uri: &str) -> Page {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn post_form(&self, uri: &str, fields: &[(&str, &str)]) -> Page {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    async fn post_multipart(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        image: Option<(&str, &str, &[u8])>,
    ) -> Page {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, content_type, data)) = image {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    fn stored_images(&self) -> Vec<String> {
        match std::fs::read_dir(self.images_dir()) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    async fn seed_game(&self, title: &str, publisher: &RecordId) -> RecordId {
        let input = GameInput {
            title: title.to_string(),
            publisher_id: publisher.clone(),
            summary: "Seeded.".to_string(),
            year: 2015,
            price: 20.0,
            number_in_stock: "3".to_string(),
            genre_ids: Vec::new(),
            platform_ids: Vec::new(),
        };
        self.state.store.add_game(&input, None).await.unwrap()
    }
}

fn id_from_location(location: &str) -> RecordId {
    location.rsplit('/').next().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_genre_create_normalizes_and_deduplicates() {
    let app = spawn_app().await;

    let created = app.post_form("/genre/create", &[("name", "  Action ")]).await;
    assert_eq!(created.status, StatusCode::SEE_OTHER);
    let location = created.location.unwrap();
    assert!(location.starts_with("/genre/"));

    let detail = app.get(&location).await;
    assert_eq!(detail.status, StatusCode::OK);
    assert!(detail.body.contains("action"));
    assert!(!detail.body.contains("Action"));

    let again = app.post_form("/genre/create", &[("name", "ACTION")]).await;
    assert_eq!(again.status, StatusCode::SEE_OTHER);
    assert_eq!(again.location.unwrap(), location);
    assert_eq!(app.state.store.genre_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_invalid_submission_rerenders_with_field_error() {
    let app = spawn_app().await;

    let page = app.post_form("/genre/create", &[("name", "ab")]).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Genre name must be at least 3 characters"));
    assert!(page.body.contains("value=\"ab\""));
    assert_eq!(app.state.store.genre_count().await.unwrap(), 0);

    let page = app.post_form("/platform/create", &[("name", "pc")]).await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_missing_and_malformed_ids_are_not_found() {
    let app = spawn_app().await;

    let page = app.get("/game/000000000000000000000000").await;
    assert_eq!(page.status, StatusCode::NOT_FOUND);
    assert!(page.body.contains("Game not found"));

    let page = app.get("/publisher/not-an-id").await;
    assert_eq!(page.status, StatusCode::NOT_FOUND);

    let page = app.get("/platform/000000000000000000000000/update").await;
    assert_eq!(page.status, StatusCode::NOT_FOUND);

    let page = app
        .post_form("/genre/000000000000000000000000/update", &[("name", "puzzle")])
        .await;
    assert_eq!(page.status, StatusCode::NOT_FOUND);

    // A missing record on the delete view goes back to the list.
    let page = app.get("/genre/000000000000000000000000/delete").await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(page.location.as_deref(), Some("/genre/all"));
}

#[tokio::test]
async fn test_game_image_lifecycle() {
    let app = spawn_app().await;
    let publisher = app.state.store.add_publisher("Nintendo", "Japan").await.unwrap();
    let genre = app.state.store.add_genre("platformer").await.unwrap();

    let created = app
        .post_multipart(
            "/game/create",
            &[
                ("title", "Super Mario Odyssey"),
                ("publisher", publisher.as_str()),
                ("summary", "A 3D platformer."),
                ("year", "2017"),
                ("price", "59.99"),
                ("numberstock", "12"),
                ("genre[]", genre.as_str()),
            ],
            Some(("cover.png", "image/png", b"\x89PNG fake")),
        )
        .await;
    assert_eq!(created.status, StatusCode::SEE_OTHER);
    let id = id_from_location(&created.location.unwrap());

    let stored = app.state.store.get_stored_game(&id).await.unwrap().unwrap();
    assert_eq!(stored.model.title, "super mario odyssey");
    assert_eq!(stored.genre_ids, vec![genre]);
    let img_src = stored.model.img_src.unwrap();
    assert!(img_src.ends_with(".png"));
    assert!(app.images_dir().join(&img_src).exists());

    let detail = app.get(&format!("/game/{id}")).await;
    assert!(detail.body.contains("platformer"));
    assert!(detail.body.contains("Nintendo"));

    let deleted = app.post_form(&format!("/game/{id}/delete"), &[]).await;
    assert_eq!(deleted.status, StatusCode::SEE_OTHER);
    assert_eq!(deleted.location.as_deref(), Some("/game/all"));
    assert!(!app.images_dir().join(&img_src).exists());
    assert!(app.state.store.get_game(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_rejected_game_leaves_no_image_behind() {
    let app = spawn_app().await;
    let publisher = app.state.store.add_publisher("Capcom", "Japan").await.unwrap();
    let genre = app.state.store.add_genre("action").await.unwrap();

    let page = app
        .post_multipart(
            "/game/create",
            &[
                ("title", "mm"),
                ("publisher", publisher.as_str()),
                ("summary", "Too short a title."),
                ("year", "2018"),
                ("price", "30"),
                ("numberstock", "1"),
                ("genre", genre.as_str()),
            ],
            Some(("cover.jpg", "image/jpeg", b"jpeg bytes")),
        )
        .await;

    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Title must be at least 3 characters"));
    assert!(page.body.contains(&format!("value=\"{genre}\" checked")));
    assert!(app.stored_images().is_empty());
    assert_eq!(app.state.store.game_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_non_image_upload_is_a_field_error() {
    let app = spawn_app().await;
    let publisher = app.state.store.add_publisher("Capcom", "Japan").await.unwrap();

    let page = app
        .post_multipart(
            "/game/create",
            &[
                ("title", "resident evil"),
                ("publisher", publisher.as_str()),
                ("summary", "Survival horror."),
                ("year", "1996"),
                ("price", "20"),
                ("numberstock", "2"),
            ],
            Some(("notes.txt", "text/plain", b"not a picture")),
        )
        .await;

    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Image must be a picture file"));
    assert!(app.stored_images().is_empty());
}

#[tokio::test]
async fn test_update_replaces_image_and_removes_old_file() {
    let app = spawn_app().await;
    let publisher = app.state.store.add_publisher("Sega", "Japan").await.unwrap();

    let fields = [
        ("title", "sonic mania"),
        ("publisher", publisher.as_str()),
        ("summary", "Fast."),
        ("year", "2017"),
        ("price", "19.99"),
        ("numberstock", "4"),
    ];

    let created = app
        .post_multipart("/game/create", &fields, Some(("a.png", "image/png", b"first")))
        .await;
    let id = id_from_location(&created.location.unwrap());
    let first = app.state.store.get_stored_game(&id).await.unwrap().unwrap();
    let first_src = first.model.img_src.unwrap();

    let updated = app
        .post_multipart(
            &format!("/game/{id}/update"),
            &fields,
            Some(("b.gif", "image/gif", b"second")),
        )
        .await;
    assert_eq!(updated.status, StatusCode::SEE_OTHER);

    let second = app.state.store.get_stored_game(&id).await.unwrap().unwrap();
    let second_src = second.model.img_src.unwrap();
    assert_ne!(first_src, second_src);
    assert!(!app.images_dir().join(&first_src).exists());
    assert!(app.images_dir().join(&second_src).exists());

    // No new file keeps the current one.
    let updated = app
        .post_multipart(&format!("/game/{id}/update"), &fields, None)
        .await;
    assert_eq!(updated.status, StatusCode::SEE_OTHER);
    let third = app.state.store.get_stored_game(&id).await.unwrap().unwrap();
    assert_eq!(third.model.img_src.as_deref(), Some(second_src.as_str()));
}

#[tokio::test]
async fn test_update_rejects_natural_key_of_another_record() {
    let app = spawn_app().await;
    app.post_form("/genre/create", &[("name", "action")]).await;
    let puzzle = app.post_form("/genre/create", &[("name", "puzzle")]).await;
    let puzzle_url = puzzle.location.unwrap();

    let page = app
        .post_form(&format!("{puzzle_url}/update"), &[("name", "Action")])
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("A genre with this name already exists"));

    // Saving a record under its own name is fine.
    let page = app
        .post_form(&format!("{puzzle_url}/update"), &[("name", "PUZZLE")])
        .await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(page.location.as_deref(), Some(puzzle_url.as_str()));

    let page = app
        .post_form(&format!("{puzzle_url}/update"), &[("name", "logic")])
        .await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    let detail = app.get(&puzzle_url).await;
    assert!(detail.body.contains("logic"));
}

#[tokio::test]
async fn test_update_form_marks_stored_selections() {
    let app = spawn_app().await;
    let store = &app.state.store;
    let publisher = store.add_publisher("Nintendo", "Japan").await.unwrap();
    let switch = store.add_platform("switch").await.unwrap();
    let other = store.add_platform("wii u").await.unwrap();

    let input = GameInput {
        title: "zelda".to_string(),
        publisher_id: publisher.clone(),
        summary: "Adventure.".to_string(),
        year: 2017,
        price: 60.0,
        number_in_stock: "9".to_string(),
        genre_ids: Vec::new(),
        platform_ids: vec![switch.clone()],
    };
    let id = store.add_game(&input, None).await.unwrap();

    let page = app.get(&format!("/game/{id}/update")).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains(&format!("value=\"{switch}\" checked")));
    assert!(!page.body.contains(&format!("value=\"{other}\" checked")));
    assert!(page.body.contains(&format!("value=\"{publisher}\" selected")));
    assert!(page.body.contains("value=\"zelda\""));
}

#[tokio::test]
async fn test_deleting_publisher_keeps_its_games() {
    let app = spawn_app().await;
    let publisher = app.state.store.add_publisher("Atari", "United States").await.unwrap();
    let game = app.seed_game("pong", &publisher).await;

    let confirm = app.get(&format!("/publisher/{publisher}/delete")).await;
    assert_eq!(confirm.status, StatusCode::OK);
    assert!(confirm.body.contains("pong"));

    let deleted = app
        .post_form(&format!("/publisher/{publisher}/delete"), &[])
        .await;
    assert_eq!(deleted.status, StatusCode::SEE_OTHER);
    assert_eq!(deleted.location.as_deref(), Some("/publisher/all"));

    assert!(app.state.store.get_publisher(&publisher).await.unwrap().is_none());
    let game = app.state.store.get_game(&game).await.unwrap().unwrap();
    assert!(game.publisher.is_none());

    let detail = app.get(&format!("/game/{}", game.id)).await;
    assert!(detail.body.contains("Unknown publisher"));
}

#[tokio::test]
async fn test_deleting_genre_unlinks_games() {
    let app = spawn_app().await;
    let store = &app.state.store;
    let publisher = store.add_publisher("Valve", "United States").await.unwrap();
    let genre = store.add_genre("shooter").await.unwrap();
    let input = GameInput {
        title: "half-life".to_string(),
        publisher_id: publisher,
        summary: "Crowbar.".to_string(),
        year: 1998,
        price: 9.99,
        number_in_stock: "1".to_string(),
        genre_ids: vec![genre.clone()],
        platform_ids: Vec::new(),
    };
    let id = store.add_game(&input, None).await.unwrap();

    let deleted = app.post_form(&format!("/genre/{genre}/delete"), &[]).await;
    assert_eq!(deleted.status, StatusCode::SEE_OTHER);

    let stored = store.get_stored_game(&id).await.unwrap().unwrap();
    assert!(stored.genre_ids.is_empty());
}

#[tokio::test]
async fn test_lists_are_sorted() {
    let app = spawn_app().await;
    for name in ["strategy", "action", "puzzle"] {
        app.post_form("/genre/create", &[("name", name)]).await;
    }

    let page = app.get("/genre/all").await;
    let action = page.body.find(">action<").unwrap();
    let puzzle = page.body.find(">puzzle<").unwrap();
    let strategy = page.body.find(">strategy<").unwrap();
    assert!(action < puzzle && puzzle < strategy);
}

fn game_fields<'a>(title: &'a str, publisher: &'a RecordId) -> Vec<(&'a str, &'a str)> {
    vec![
        ("title", title),
        ("publisher", publisher.as_str()),
        ("summary", "Plenty to do."),
        ("year", "2019"),
        ("price", "39.99"),
        ("numberstock", "5"),
    ]
}

#[tokio::test]
async fn test_image_size_limit_is_a_field_error() {
    let app = spawn_app_with(|config| config.server.max_upload_bytes = 1024).await;
    let publisher = app.state.store.add_publisher("Nintendo", "Japan").await.unwrap();

    let page = app
        .post_multipart(
            "/game/create",
            &game_fields("too big a cover", &publisher),
            Some(("big.png", "image/png", &[7u8; 2048])),
        )
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Image must be at most 1024 bytes"));
    assert!(app.stored_images().is_empty());
    assert_eq!(app.state.store.game_count().await.unwrap(), 0);

    let page = app
        .post_multipart(
            "/game/create",
            &game_fields("exactly at the limit", &publisher),
            Some(("fits.png", "image/png", &[7u8; 1024])),
        )
        .await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(app.stored_images().len(), 1);
}

#[tokio::test]
async fn test_duplicate_game_redirects_and_discards_upload() {
    let app = spawn_app().await;
    let publisher = app.state.store.add_publisher("Nintendo", "Japan").await.unwrap();
    let fields = game_fields("animal crossing", &publisher);

    let created = app
        .post_multipart("/game/create", &fields, Some(("a.png", "image/png", b"first")))
        .await;
    assert_eq!(created.status, StatusCode::SEE_OTHER);
    let location = created.location.unwrap();

    let mut shouted = fields.clone();
    shouted[0] = ("title", "  Animal Crossing ");
    let again = app
        .post_multipart("/game/create", &shouted, Some(("b.png", "image/png", b"second")))
        .await;
    assert_eq!(again.status, StatusCode::SEE_OTHER);
    assert_eq!(again.location.as_deref(), Some(location.as_str()));

    assert_eq!(app.state.store.game_count().await.unwrap(), 1);
    assert_eq!(app.stored_images().len(), 1);
}

#[tokio::test]
async fn test_failed_update_still_shows_current_cover() {
    let app = spawn_app().await;
    let publisher = app.state.store.add_publisher("Sega", "Japan").await.unwrap();
    let fields = game_fields("yakuza zero", &publisher);

    let created = app
        .post_multipart("/game/create", &fields, Some(("a.png", "image/png", b"cover")))
        .await;
    let id = id_from_location(&created.location.unwrap());

    let mut invalid = fields.clone();
    invalid[0] = ("title", "yz");
    let page = app
        .post_multipart(&format!("/game/{id}/update"), &invalid, None)
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Title must be at least 3 characters"));
    assert!(page.body.contains("class=\"thumb\""));
}

#[tokio::test]
async fn test_publisher_names_are_unique_ignoring_case() {
    let app = spawn_app().await;

    let created = app
        .post_form("/publisher/create", &[("name", "Nintendo"), ("country", "Japan")])
        .await;
    assert_eq!(created.status, StatusCode::SEE_OTHER);
    let location = created.location.unwrap();

    let again = app
        .post_form("/publisher/create", &[("name", "nintendo"), ("country", "Japan")])
        .await;
    assert_eq!(again.status, StatusCode::SEE_OTHER);
    assert_eq!(again.location.as_deref(), Some(location.as_str()));
    assert_eq!(app.state.store.publisher_count().await.unwrap(), 1);

    let sega = app
        .post_form("/publisher/create", &[("name", "Sega"), ("country", "Japan")])
        .await;
    let page = app
        .post_form(
            &format!("{}/update", sega.location.unwrap()),
            &[("name", "NINTENDO"), ("country", "Japan")],
        )
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("A publisher with this name already exists"));
}
