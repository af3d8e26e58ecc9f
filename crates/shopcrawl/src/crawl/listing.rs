// Copyright 2026 Shopcrawl Contributors
// SPDX-License-Identifier: Apache-2.0

//! Product cards on a listing page, turned into output records.

use super::accessor::ElementAccessor;
use super::audience;
use super::detail::DeepScraper;
use crate::config::{CrawlConfig, Selectors};
use crate::driver::{AutomationDriver, Locator};
use crate::progress::{CrawlEventKind, ProgressEmitter};
use crate::record::{DetailEnrichment, ProductRecord};
use tracing::debug;

/// Where a listing page sits in the crawl.
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    pub section: &'a str,
    pub sub_category: &'a str,
    pub page: u32,
}

/// Fields read from one card on the listing page itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardFields {
    pub name: String,
    pub price: String,
    pub url: String,
}

/// Detail brand when present, else the first word of the product name.
pub fn brand_heuristic(detail_brand: &str, name: &str) -> String {
    if !detail_brand.is_empty() {
        return detail_brand.to_string();
    }
    name.split_whitespace().next().unwrap_or_default().to_string()
}

pub fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Assemble the fixed-schema record for one card.
pub fn build_record(ctx: &PageContext<'_>, card: CardFields, detail: DetailEnrichment) -> ProductRecord {
    ProductRecord {
        created_at: timestamp(),
        top_section: ctx.section.to_string(),
        sub_category: ctx.sub_category.to_string(),
        brand_heuristic_listing: brand_heuristic(&detail.brand, &card.name),
        target_audience: audience::classify(&card.name),
        product_name: card.name,
        price: card.price,
        original_price: String::new(),
        discount: String::new(),
        rating_listing: String::new(),
        rating_detail: detail.rating,
        reviews_count_listing: String::new(),
        reviews_count_detail: detail.reviews_count,
        availability: detail.availability,
        seller: detail.seller,
        product_url: card.url,
        image_url_listing: String::new(),
        image_url_detail: detail.image_url_detail,
        short_description: String::new(),
        full_description: detail.full_description,
        bread_crumbs: detail.breadcrumbs,
        page: ctx.page,
    }
}

pub struct ListingExtractor {
    selectors: Selectors,
    max_products: Option<usize>,
    deep: DeepScraper,
}

impl ListingExtractor {
    pub fn from_config(config: &CrawlConfig) -> Self {
        Self {
            selectors: config.selectors.clone(),
            max_products: config.max_products_per_page,
            deep: DeepScraper::from_config(config),
        }
    }

    /// Read name, price and link of every card on the focused page.
    pub async fn read_cards(&self, dom: &ElementAccessor<'_>) -> Vec<CardFields> {
        let mut cards = dom.all(&Locator::css(&self.selectors.card)).await;
        if let Some(cap) = self.max_products {
            cards.truncate(cap);
        }

        let title = Locator::css(&self.selectors.card_title);
        let price = Locator::css(&self.selectors.card_price);
        let link = Locator::tag("a");

        let mut fields = Vec::with_capacity(cards.len());
        for card in cards {
            fields.push(CardFields {
                name: dom.first_text_in(card, &title).await.unwrap_or_default(),
                price: dom.first_text_in(card, &price).await.unwrap_or_default(),
                url: dom
                    .first_attribute_in(card, &link, "href")
                    .await
                    .unwrap_or_default(),
            });
        }
        fields
    }

    /// One record per card on the focused page, each enriched from its
    /// detail page. An empty result means the page had no cards.
    pub async fn extract(
        &self,
        driver: &mut dyn AutomationDriver,
        ctx: &PageContext<'_>,
        progress: &ProgressEmitter,
    ) -> Vec<ProductRecord> {
        let cards = self.read_cards(&ElementAccessor::new(&*driver)).await;
        debug!(
            "{} / {} page {}: {} cards",
            ctx.section,
            ctx.sub_category,
            ctx.page,
            cards.len()
        );

        let mut records = Vec::with_capacity(cards.len());
        for card in cards {
            let detail = match self.deep.try_scrape(driver, &card.url).await {
                Ok(detail) => detail,
                Err(e) => {
                    progress.emit(CrawlEventKind::DetailScrapeFailed {
                        url: card.url.clone(),
                        message: e.to_string(),
                    });
                    DetailEnrichment::default()
                }
            };
            records.push(build_record(ctx, card, detail));
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::audience::Audience;
    use crate::driver::scripted::{PageFixture, ScriptedDriver};

    const LISTING: &str = "https://www.snapdeal.com/products/mens-shirts";

    const CARDS: &str = r#"
        <html><body>
          <div class="product-tuple-listing">
            <a href="/product/roadster-shirt/1"><p class="product-title">Roadster Men's Casual Shirt</p></a>
            <span class="product-price">Rs. 499</span>
          </div>
          <div class="product-tuple-listing">
            <p class="product-title">Girls Frock</p>
          </div>
          <div class="product-tuple-listing">
            <a href="/product/bottle/3">buy</a>
          </div>
        </body></html>"#;

    const DETAIL: &str = r#"<span class="brand-name">Roadster Co</span>
        <span class="availability-message">Sold Out</span>"#;

    fn ctx() -> PageContext<'static> {
        PageContext {
            section: "Men Clothing",
            sub_category: "Shirts",
            page: 3,
        }
    }

    async fn driver() -> ScriptedDriver {
        let mut d = ScriptedDriver::new()
            .with_page(LISTING, PageFixture::html(CARDS))
            .with_page(
                "https://www.snapdeal.com/product/roadster-shirt/1",
                PageFixture::html(DETAIL),
            )
            .with_page(
                "https://www.snapdeal.com/product/bottle/3",
                PageFixture::html("<p/>").never_opens(),
            );
        d.navigate(LISTING).await.unwrap();
        d
    }

    #[test]
    fn test_brand_heuristic() {
        assert_eq!(brand_heuristic("Acme", "Zeta Phone"), "Acme");
        assert_eq!(brand_heuristic("", "Zeta Phone 5G"), "Zeta");
        assert_eq!(brand_heuristic("", ""), "");
    }

    #[tokio::test]
    async fn test_absent_card_fields_are_empty() {
        let d = driver().await;
        let extractor = ListingExtractor::from_config(&CrawlConfig::default().without_delays());
        let cards = extractor.read_cards(&ElementAccessor::new(&d)).await;
        assert_eq!(cards.len(), 3);
        assert_eq!(cards[0].name, "Roadster Men's Casual Shirt");
        assert_eq!(cards[0].price, "Rs. 499");
        assert_eq!(cards[0].url, "https://www.snapdeal.com/product/roadster-shirt/1");
        assert_eq!(cards[1].url, "");
        assert_eq!(cards[1].price, "");
        assert_eq!(cards[2].name, "");
    }

    #[tokio::test]
    async fn test_records_carry_page_context_and_enrichment() {
        let mut d = driver().await;
        let extractor = ListingExtractor::from_config(&CrawlConfig::default().without_delays());
        let (tx, mut rx) = crate::progress::channel();
        let progress = ProgressEmitter::new(Some(tx));

        let records = extractor.extract(&mut d, &ctx(), &progress).await;
        assert_eq!(records.len(), 3);

        let shirt = &records[0];
        assert_eq!(shirt.top_section, "Men Clothing");
        assert_eq!(shirt.sub_category, "Shirts");
        assert_eq!(shirt.page, 3);
        assert_eq!(shirt.brand_heuristic_listing, "Roadster Co");
        assert_eq!(shirt.availability, "Sold Out");
        assert_eq!(shirt.target_audience, Audience::Male);
        assert_eq!(shirt.created_at.len(), "2026-01-02 03:04:05".len());

        // No URL: no detail page, brand from the name.
        let frock = &records[1];
        assert_eq!(frock.target_audience, Audience::Female);
        assert_eq!(frock.brand_heuristic_listing, "Girls");
        assert_eq!(frock.availability, "");

        // Detail context never opened: defaults, reported as an event.
        let bottle = &records[2];
        assert_eq!(bottle.product_url, "https://www.snapdeal.com/product/bottle/3");
        assert_eq!(bottle.seller, "");
        let event = rx.try_recv().unwrap();
        assert!(matches!(
            event.event,
            CrawlEventKind::DetailScrapeFailed { ref url, .. } if url == &bottle.product_url
        ));

        assert_eq!(d.open_contexts(), 1);
        assert_eq!(d.current_url().await.unwrap(), LISTING);
    }

    #[tokio::test]
    async fn test_product_cap_per_page() {
        let mut d = driver().await;
        let mut config = CrawlConfig::default().without_delays();
        config.max_products_per_page = Some(1);
        let records = ListingExtractor::from_config(&config)
            .extract(&mut d, &ctx(), &ProgressEmitter::disabled())
            .await;
        assert_eq!(records.len(), 1);
        assert_eq!(d.stats().open_requests, 1);
    }
}
