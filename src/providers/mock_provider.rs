use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::providers_errors::ProviderError;
use super::providers_model::{
    NormalizedListing, PaginationModel, ProviderCapabilityContract, SearchQuery,
};
use super::providers_traits::ProviderClient;

const BASE_TITLES: [&str; 5] = [
    "Primus - Sailing the Seas of Cheese (Vinyl)",
    "Primus - Frizzle Fry LP Vinyl",
    "Les Claypool - Of Whales and Woe (Vinyl)",
    "Radiohead - OK Computer (Vinyl)",
    "Miles Davis - Kind of Blue (Vinyl)",
];

const CONDITIONS: [Option<&str>; 4] = [None, Some("VG"), Some("VG+"), Some("NM")];
const SELLERS: [Option<&str>; 3] = [None, Some("some_seller"), Some("vinyl_shop_42")];

/// Deterministic in-process adapter.
///
/// Results are a pure function of the query seed so repeated runs are stable
/// and idempotent, which is what the dedup and snapshot tests rely on.
#[derive(Debug, Default)]
pub struct MockProvider;

// Tiny splitmix-style generator; enough for stable fake data.
struct SeededRng(u64);

impl SeededRng {
    fn from_seed(seed: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        seed.hash(&mut hasher);
        Self(hasher.finish() | 1)
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E3779B97F4A7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u64() % items.len() as u64) as usize]
    }

    /// Price in cents between 15.00 and 120.00.
    fn price(&mut self) -> Decimal {
        let cents = 1_500 + (self.next_u64() % (12_000 - 1_500)) as i64;
        Decimal::new(cents, 2)
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    fn id(&self) -> &'static str {
        "mock"
    }

    fn default_endpoint(&self) -> &'static str {
        "/mock/search"
    }

    fn capability_contract(&self) -> ProviderCapabilityContract {
        ProviderCapabilityContract {
            supports_search: true,
            requires_auth: false,
            pagination_model: PaginationModel::None,
        }
    }

    async fn search(
        &self,
        query: &SearchQuery,
        limit: u32,
    ) -> Result<Vec<NormalizedListing>, ProviderError> {
        let keywords = query.normalized_keywords();
        let seed = query.seed.clone().unwrap_or_else(|| "default".to_string());
        let mut rng = SeededRng::from_seed(&seed);
        let seed_short = format!("{:08x}", rng.next_u64() as u32);

        let pick_title = |rng: &mut SeededRng| -> &'static str {
            if keywords.iter().any(|k| k == "primus") {
                *rng.pick(&BASE_TITLES[..3])
            } else {
                *rng.pick(&BASE_TITLES)
            }
        };

        let count = limit.min(5);
        let mut results = Vec::with_capacity(count as usize);

        for i in 0..count {
            // Guarantee one under-ceiling Primus hit when the rule asks for one.
            let (title, price) = match query.max_price {
                Some(max_price)
                    if i == 0
                        && keywords.iter().any(|k| k == "primus")
                        && keywords.iter().any(|k| k == "vinyl") =>
                {
                    (BASE_TITLES[0], max_price - Decimal::new(1, 2))
                }
                _ => (pick_title(&mut rng), rng.price()),
            };

            results.push(NormalizedListing {
                provider: self.id().to_string(),
                external_id: format!("mock-{}-{}", seed_short, i),
                url: format!("https://example.com/mock/{}/{}", seed_short, i),
                title: title.to_string(),
                price,
                currency: "USD".to_string(),
                condition: (*rng.pick(&CONDITIONS)).map(str::to_string),
                seller: (*rng.pick(&SELLERS)).map(str::to_string),
                location: None,
                discogs_release_id: None,
                discogs_master_id: None,
                raw: Some(serde_json::json!({ "mock": true, "seed": seed })),
            });
        }

        Ok(results)
    }
}
