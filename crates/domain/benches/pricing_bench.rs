use std::collections::HashMap;

use common::ProductId;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{LineItemRequest, Money, OrderRequest, ProductSnapshot, price_order};

fn make_request(lines: usize) -> OrderRequest {
    let items = (1..=lines)
        .map(|i| LineItemRequest::new(i.to_string(), 2))
        .collect();
    OrderRequest::new("1", items, "pm_bench")
}

fn make_catalog(products: usize) -> HashMap<ProductId, ProductSnapshot> {
    (1..=products as i64)
        .map(|i| {
            let id = ProductId::new(i);
            (
                id,
                ProductSnapshot::new(id, format!("Product {i}"), Money::from_cents(999), 100),
            )
        })
        .collect()
}

fn bench_validate_request(c: &mut Criterion) {
    let request = make_request(50);

    c.bench_function("domain/validate_50_items", |b| {
        b.iter(|| request.validate().unwrap());
    });
}

fn bench_price_order(c: &mut Criterion) {
    let validated = make_request(50).validate().unwrap();
    let catalog = make_catalog(50);

    c.bench_function("domain/price_50_items", |b| {
        b.iter(|| price_order(&validated.items, &catalog).unwrap());
    });
}

fn bench_distinct_products(c: &mut Criterion) {
    let validated = make_request(200).validate().unwrap();

    c.bench_function("domain/distinct_products_200_items", |b| {
        b.iter(|| validated.distinct_products());
    });
}

criterion_group!(
    benches,
    bench_validate_request,
    bench_price_order,
    bench_distinct_products
);
criterion_main!(benches);
