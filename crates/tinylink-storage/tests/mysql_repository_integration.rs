use jiff::{SignedDuration, Timestamp};
use tinylink_core::{ShortCode, UrlRecord};
use tinylink_storage::{MySqlRepository, ReadRepository, Repository, StorageError, MYSQL_SCHEMA};
use tinylink_test_infra::mysql::{MySqlServer, MysqlConfig};

struct Fixture {
    _mysql: MySqlServer,
    repo: MySqlRepository,
}

impl Fixture {
    async fn start() -> Self {
        let mysql = MySqlServer::new(MysqlConfig::builder().build())
            .await
            .expect("start mysql");
        let pool = mysql.pool().await.expect("mysql pool");
        mysql.apply_schema(&pool, MYSQL_SCHEMA)
            .await
            .expect("create schema");

        Self {
            _mysql: mysql,
            repo: MySqlRepository::new(pool),
        }
    }
}

fn record(counter: u64, url: &str, expire_at: Option<Timestamp>) -> UrlRecord {
    UrlRecord {
        code: ShortCode::from_counter(counter),
        original_url: url.to_string(),
        counter,
        created_at: Timestamp::from_second(Timestamp::now().as_second()).unwrap(),
        expire_at,
    }
}

#[tokio::test]
async fn insert_and_find_record() {
    let fixture = Fixture::start().await;
    let rec = record(125, "https://example.com", None);

    fixture.repo.insert(&rec).await.unwrap();

    let by_code = fixture.repo.find_by_code(&rec.code).await.unwrap().unwrap();
    assert_eq!(by_code, rec);

    let by_url = fixture
        .repo
        .find_by_url("https://example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_url, rec);
}

#[tokio::test]
async fn unknown_code_and_url_are_absent() {
    let fixture = Fixture::start().await;

    assert!(fixture
        .repo
        .find_by_code(&ShortCode::from_counter(1))
        .await
        .unwrap()
        .is_none());
    assert!(fixture
        .repo
        .find_by_url("https://missing.example")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn insert_conflicts_when_code_already_exists() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .insert(&record(1, "https://one.example", None))
        .await
        .unwrap();

    let err = fixture
        .repo
        .insert(&record(1, "https://two.example", None))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::CodeConflict(_)));
}

#[tokio::test]
async fn insert_conflicts_when_url_already_shortened() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .insert(&record(1, "https://same.example", None))
        .await
        .unwrap();

    let err = fixture
        .repo
        .insert(&record(2, "https://same.example", None))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::UrlConflict(_)));
}

#[tokio::test]
async fn expired_record_is_still_returned() {
    let fixture = Fixture::start().await;
    let expired = Timestamp::from_second(Timestamp::now().as_second()).unwrap()
        - SignedDuration::from_secs(60);
    let rec = record(7, "https://expired.example", Some(expired));

    fixture.repo.insert(&rec).await.unwrap();

    let got = fixture.repo.find_by_code(&rec.code).await.unwrap().unwrap();
    assert_eq!(got.expire_at, Some(expired));
}

#[tokio::test]
async fn large_counter_round_trips() {
    let fixture = Fixture::start().await;
    let rec = record(u64::MAX, "https://max.example", None);

    fixture.repo.insert(&rec).await.unwrap();

    let got = fixture.repo.find_by_code(&rec.code).await.unwrap().unwrap();
    assert_eq!(got.counter, u64::MAX);
}
