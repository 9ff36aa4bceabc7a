use criterion::{Criterion, criterion_group, criterion_main};
use gogetter::{Registry, RepositoryRecord, conf::TranslatorConfig};
use rand::{Rng, distr::Alphanumeric};

const REPOS: u64 = 5000;

fn random_name(rng: &mut impl Rng) -> String {
    let segments = rng.random_range(1..=4);
    (0..segments)
        .map(|_| {
            let len = rng.random_range(3..10);
            (0..len)
                .map(|_| char::from(rng.sample(Alphanumeric)))
                .collect::<String>()
                .to_lowercase()
        })
        .collect::<Vec<_>>()
        .join("-")
}

fn populated_registry(runtime: &tokio::runtime::Runtime) -> (Registry, Vec<String>) {
    let registry = Registry::new(&[TranslatorConfig {
        prefix: "go.acme.example".to_string(),
        owners: vec!["acme".to_string()],
    }])
    .unwrap();

    let mut rng = rand::rng();
    let names: Vec<String> = (0..REPOS).map(|_| random_name(&mut rng)).collect();

    runtime.block_on(async {
        for (id, name) in names.iter().enumerate() {
            let record = RepositoryRecord {
                id: id as u64,
                owner_login: "acme".to_string(),
                name: name.clone(),
                language: Some("Go".to_string()),
                clone_url: format!("https://github.com/acme/{}.git", name),
                ..Default::default()
            };
            registry.update_repo(&record, false).await;
        }
    });

    let paths = names
        .iter()
        .map(|n| format!("go.acme.example/{}/internal/deep/pkg/v3", n.replace('-', "/")))
        .collect();

    (registry, paths)
}

fn bench_lookup(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (registry, paths) = populated_registry(&runtime);
    let registry = &registry;
    let paths = &paths;

    c.bench_function("Lookup deep versioned path", |b| {
        let mut i = 0;
        b.to_async(&runtime).iter(move || {
            i = (i + 1) % paths.len();
            let path = &paths[i];
            async move { assert!(registry.lookup(path).await.is_some()) }
        })
    });

    c.bench_function("Lookup unknown path", |b| {
        b.to_async(&runtime).iter(move || async move {
            assert!(registry.lookup("elsewhere.example/a/b/c/d/e/f").await.is_none())
        })
    });
}

criterion_group!(benches, bench_lookup);
criterion_main!(benches);
