use criterion::{Criterion, criterion_group, criterion_main};
use tinted::{HighlightOptions, Registry};

fn sample_json() -> String {
    let mut out = String::from("[\n");
    for i in 0..500 {
        out.push_str(&format!(
            "  {{\"id\": {i}, \"name\": \"item \\\"{i}\\\"\", \"ok\": true, \"ratio\": {i}.5e-3, \"tag\": null}},\n"
        ));
    }
    out.push_str("  {}\n]\n");
    out
}

fn sample_markup() -> String {
    let mut out = String::from("<!DOCTYPE html>\n<html>\n<body>\n");
    for i in 0..300 {
        out.push_str(&format!(
            "  <div class=\"row r{i}\" data-x='{i}'><a href=\"/p?{i}&amp;q\">link &lt;{i}&gt;</a><br/></div>\n"
        ));
    }
    out.push_str("<!-- done -->\n</body>\n</html>\n");
    out
}

fn tokenize_benchmark(c: &mut Criterion) {
    let registry = Registry::builtin().expect("builtin grammars should load");
    let json = sample_json();
    let markup = sample_markup();
    let json_id = registry.grammar_id("json").unwrap();
    let markup_id = registry.grammar_id("markup").unwrap();

    c.bench_function("tokenize json", |b| {
        b.iter(|| {
            let result = registry.tokenize(&json, json_id).unwrap();
            std::hint::black_box(result);
        })
    });

    c.bench_function("tokenize markup", |b| {
        b.iter(|| {
            let result = registry.tokenize(&markup, markup_id).unwrap();
            std::hint::black_box(result);
        })
    });
}

fn highlight_benchmark(c: &mut Criterion) {
    let registry = Registry::builtin().expect("builtin grammars should load");
    let markup = sample_markup();

    c.bench_function("highlight markup", |b| {
        b.iter(|| {
            let result = registry
                .highlight(&markup, HighlightOptions::new("html"))
                .unwrap();
            std::hint::black_box(result);
        })
    });
}

criterion_group!(benches, tokenize_benchmark, highlight_benchmark);
criterion_main!(benches);
