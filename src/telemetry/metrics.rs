use std::sync::LazyLock;

use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
};

pub static METER: LazyLock<Meter> = LazyLock::new(|| global::meter("foodgram"));

pub static RECIPES_CREATED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("recipes.created")
        .with_description("Total recipes created")
        .build()
});

pub static RECIPES_UPDATED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("recipes.updated")
        .with_description("Total recipes updated")
        .build()
});

pub static RECIPES_DELETED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("recipes.deleted")
        .with_description("Total recipes deleted")
        .build()
});

pub static FAVORITES_ADDED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("favorites.added")
        .with_description("Total favorites added")
        .build()
});

pub static FAVORITES_REMOVED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("favorites.removed")
        .with_description("Total favorites removed")
        .build()
});

pub static CART_ENTRIES_ADDED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("shopping_cart.added")
        .with_description("Total recipes added to shopping carts")
        .build()
});

pub static CART_ENTRIES_REMOVED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("shopping_cart.removed")
        .with_description("Total recipes removed from shopping carts")
        .build()
});

pub static SHOPPING_LISTS_GENERATED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("shopping_lists.generated")
        .with_description("Total shopping list reports generated")
        .build()
});

pub static SUBSCRIPTIONS_ADDED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("subscriptions.added")
        .with_description("Total author subscriptions created")
        .build()
});

pub static SUBSCRIPTIONS_REMOVED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("subscriptions.removed")
        .with_description("Total author subscriptions removed")
        .build()
});

pub static USERS_REGISTERED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("users.registered")
        .with_description("Total users registered")
        .build()
});

pub static HTTP_REQUESTS_TOTAL: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("http.requests.total")
        .with_description("Total number of HTTP requests")
        .with_unit("{request}")
        .build()
});

pub static HTTP_REQUEST_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("http.request.duration")
        .with_description("HTTP request duration in milliseconds")
        .with_unit("ms")
        .with_boundaries(vec![
            1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
        ])
        .build()
});
