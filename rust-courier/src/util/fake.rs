//! Synthetic customer data.

use rand::prelude::*;

use crate::queue::{Customer, CUSTOMER_ID_MAX, CUSTOMER_ID_MIN};

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Grace", "Linus", "Margaret", "Dennis", "Barbara", "Ken", "Frances", "Edsger",
    "Radia", "Donald", "Katherine", "John", "Hedy", "Niklaus", "Sophie", "Tim", "Karen", "Bjarne",
];

const LAST_NAMES: &[&str] = &[
    "Lovelace", "Turing", "Hopper", "Torvalds", "Hamilton", "Ritchie", "Liskov", "Thompson",
    "Allen", "Dijkstra", "Perlman", "Knuth", "Johnson", "McCarthy", "Lamarr", "Wirth", "Wilson",
    "Berners-Lee", "Jones", "Stroustrup",
];

const COUNTRIES: &[&str] = &[
    "Argentina", "Australia", "Brazil", "Canada", "Chile", "Colombia", "Denmark", "Egypt",
    "Finland", "France", "Germany", "India", "Ireland", "Japan", "Kenya", "Mexico", "Netherlands",
    "New Zealand", "Norway", "Peru", "Portugal", "South Africa", "Spain", "Sweden",
    "United Kingdom", "United States", "Uruguay",
];

const DOMAIN_WORDS: &[&str] = &[
    "acme", "blue", "cloud", "data", "delta", "forge", "global", "harbor", "lab", "metro",
    "nova", "orbit", "pixel", "prime", "river", "solar", "stone", "summit", "vertex", "wave",
];

const TLDS: &[&str] = &["com", "net", "org", "info", "biz", "io"];

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, pool: &[&'a str]) -> &'a str {
    // Pools are non-empty constants.
    pool.choose(rng).copied().unwrap_or_default()
}

/// Random `"<first> <last>"` name.
pub fn fake_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES))
}

/// Random country name.
pub fn fake_country<R: Rng + ?Sized>(rng: &mut R) -> String {
    pick(rng, COUNTRIES).to_string()
}

/// Random website URL such as `https://www.novaorbit.net/`.
pub fn fake_url<R: Rng + ?Sized>(rng: &mut R) -> String {
    let scheme = if rng.gen_bool(0.5) { "https" } else { "http" };
    let www = if rng.gen_bool(0.5) { "www." } else { "" };
    let first = pick(rng, DOMAIN_WORDS);
    let mut second = pick(rng, DOMAIN_WORDS);
    while second == first {
        second = pick(rng, DOMAIN_WORDS);
    }
    let tld = pick(rng, TLDS);

    format!("{}://{}{}{}.{}/", scheme, www, first, second, tld)
}

/// Build one customer record with random field values.
pub fn generate_customer<R: Rng + ?Sized>(rng: &mut R) -> Customer {
    Customer {
        id: rng.gen_range(CUSTOMER_ID_MIN..=CUSTOMER_ID_MAX),
        name: fake_name(rng),
        country: fake_country(rng),
        website: fake_url(rng),
    }
}

/// [`generate_customer`] using the thread-local RNG.
pub fn random_customer() -> Customer {
    generate_customer(&mut thread_rng())
}
