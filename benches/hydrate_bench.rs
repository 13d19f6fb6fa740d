use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rfhydrate::sections::{self, DEFAULT_SERVICE_DOMAIN};
use rfhydrate::{map_record, ContentPayload, Hydrator, Page, SourceConfig, StaticFetcher};

const TOPPAGE: &str = include_str!("../tests/fixtures/content/toppage.json");
const RECRUITMENT: &str = include_str!("../tests/fixtures/content/recruitment.json");
const INDEX: &str = include_str!("../tests/fixtures/pages/index.html");
const JOBS: &str = include_str!("../tests/fixtures/pages/recruitment.html");

fn source(endpoint: &str) -> SourceConfig {
    SourceConfig::new(DEFAULT_SERVICE_DOMAIN, endpoint, "bench")
}

fn bench_decode_and_map(c: &mut Criterion) {
    let schema = rfhydrate::Schema::new()
        .field(rfhydrate::FieldSpec::text("featurestitle1", "title", "フィーチャー1"))
        .field(rfhydrate::FieldSpec::text("featuresdescription1", "description", "フィーチャー1の説明"))
        .field(rfhydrate::FieldSpec::media("featuresimage1", "image", "images/1.png"));

    c.bench_function("decode_and_map_toppage", |b| {
        b.iter(|| {
            let payload = ContentPayload::from_slice(black_box(TOPPAGE.as_bytes())).unwrap();
            let record = payload.single().unwrap();
            black_box(map_record(record, &schema));
        })
    });
}

fn bench_hydrate_page(c: &mut Criterion) {
    let fetcher = StaticFetcher::new()
        .with_response("toppage", rfhydrate::fetch::StaticResponse::Body(TOPPAGE.into()))
        .with_response("recruitment", rfhydrate::fetch::StaticResponse::Body(RECRUITMENT.into()));
    let hydrator = Hydrator::new(fetcher)
        .with_section(sections::toppage(source("toppage")))
        .with_section(sections::recruitment(source("recruitment")));

    c.bench_function("hydrate_toppage", |b| {
        b.iter(|| {
            let mut page = Page::parse(black_box(INDEX));
            hydrator.run(&mut page, "toppage").unwrap();
            black_box(page.html());
        })
    });

    c.bench_function("hydrate_recruitment", |b| {
        b.iter(|| {
            let mut page = Page::parse(black_box(JOBS));
            hydrator.run(&mut page, "recruitment").unwrap();
            black_box(page.html());
        })
    });
}

criterion_group!(benches, bench_decode_and_map, bench_hydrate_page);
criterion_main!(benches);
