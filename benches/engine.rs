//! Benchmarks over the rule evaluation hot path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rampart::Waf;

const RULES: &str = r#"
SecRuleEngine On
SecRequestBodyAccess On

SecRule REQUEST_URI "@rx (?i)(union\s+select|sleep\s*\()" "id:1001,phase:1,log,deny,status:403"
SecRule ARGS "@detectSQLi" "id:1002,phase:2,log,deny,status:403,t:urlDecode,t:lowercase"
SecRule ARGS "@detectXSS" "id:1003,phase:2,log,deny,status:403,t:urlDecode,t:htmlEntityDecode"
SecRule REQUEST_HEADERS:User-Agent "@pm sqlmap nikto nessus acunetix" "id:1004,phase:1,log,deny,status:403"
SecRule &ARGS "@gt 20" "id:1005,phase:2,log,deny,status:400"
SecRule REQUEST_URI "@beginsWith /user/" "id:1006,phase:1,nolog,pass,chain"
SecRule REQUEST_URI "@rx ^/user/(\d+)$" "capture,setvar:tx.user_id=%{TX.1}"
"#;

fn bench_clean_request(c: &mut Criterion) {
    let waf = Waf::from_directives(RULES).unwrap();

    c.bench_function("clean_request_all_phases", |b| {
        b.iter(|| {
            let mut tx = waf.new_transaction();
            tx.process_connection("203.0.113.10", 40000, "10.0.0.1", 443)
                .unwrap();
            tx.process_uri(
                black_box("/products?category=books&sort=price&page=3"),
                "GET",
                "HTTP/1.1",
            )
            .unwrap();
            tx.add_request_header("Host", "shop.example.com").unwrap();
            tx.add_request_header("User-Agent", "Mozilla/5.0").unwrap();
            tx.process_request_headers().unwrap();
            tx.process_request_body().unwrap();
            tx.process_logging().unwrap();
            black_box(tx.interrupted())
        })
    });
}

fn bench_blocked_request(c: &mut Criterion) {
    let waf = Waf::from_directives(RULES).unwrap();

    c.bench_function("sqli_blocked_phase_2", |b| {
        b.iter(|| {
            let mut tx = waf.new_transaction();
            tx.process_uri(
                black_box("/search?q=1%27%20OR%20%271%27%3D%271"),
                "GET",
                "HTTP/1.1",
            )
            .unwrap();
            tx.process_request_headers().unwrap();
            tx.process_request_body().unwrap();
            tx.process_logging().unwrap();
            black_box(tx.interrupted())
        })
    });
}

fn bench_capture_chain(c: &mut Criterion) {
    let waf = Waf::from_directives(RULES).unwrap();

    c.bench_function("capture_chain", |b| {
        b.iter(|| {
            let mut tx = waf.new_transaction();
            tx.process_uri(black_box("/user/42"), "GET", "HTTP/1.1").unwrap();
            tx.process_request_headers().unwrap();
            black_box(tx.tx_data().first("user_id").map(str::to_string))
        })
    });
}

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile_ruleset", |b| {
        b.iter(|| Waf::from_directives(black_box(RULES)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_clean_request,
    bench_blocked_request,
    bench_capture_chain,
    bench_compile
);
criterion_main!(benches);
