extern crate criterion;

use criterion::{criterion_group, criterion_main, Criterion};

use cssreconcile_lib::parser::css_reader::parse_stylesheet;
use cssreconcile_lib::style::canonical::canonicalize;
use cssreconcile_lib::style::classifier::classify;
use cssreconcile_lib::style::patterns::PatternTable;
use cssreconcile_lib::style::reference_set::{ReferenceSet, ReferenceSource};

fn large_stylesheet(rules: usize) -> String {
    let mut css = String::with_capacity(rules * 96);
    for i in 0..rules {
        css.push_str(&format!(
            ".block-{i} > .item {{ color: #F{d}F; margin: 0px {i}px; padding: calc( 1rem + {i}px ); }}\n",
            i = i,
            d = i % 10
        ));
        if i % 50 == 0 {
            css.push_str(&format!(
                "@media screen and (min-width: {i}px) {{ .medium-{n} {{ width: 50%; }} }}\n",
                i = i,
                n = i % 12
            ));
        }
    }
    css
}

fn bench_canonicalize(c: &mut Criterion) {
    let sheet = parse_stylesheet(&large_stylesheet(20_000), "large.css").unwrap();
    let rules = sheet.rules();

    c.bench_function("canonicalize_20k_rules", |b| {
        b.iter(|| rules.iter().map(|rule| canonicalize(rule)).count())
    });
}

fn bench_reference_set(c: &mut Criterion) {
    let css = large_stylesheet(20_000);

    c.bench_function("reference_set_20k_rules", |b| {
        b.iter(|| {
            ReferenceSet::build(
                &[ReferenceSource {
                    origin: "large.css",
                    css: &css,
                }],
                false,
            )
            .unwrap()
        })
    });
}

fn bench_classify(c: &mut Criterion) {
    let reference_css = large_stylesheet(10_000);
    let reference = ReferenceSet::build(
        &[ReferenceSource {
            origin: "reference.css",
            css: &reference_css,
        }],
        false,
    )
    .unwrap();
    let theme = parse_stylesheet(&large_stylesheet(20_000), "theme.css").unwrap();
    let patterns = PatternTable::default();

    c.bench_function("classify_20k_rules", |b| {
        b.iter(|| classify(theme.clone(), &reference, &patterns))
    });
}

criterion_group!(benches, bench_canonicalize, bench_reference_set, bench_classify);
criterion_main!(benches);
