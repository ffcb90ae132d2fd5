use crate::{
    entities::{category, product, Category, Product},
    errors::ServiceError,
};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use std::sync::Arc;
use tracing::instrument;

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

/// Read-side catalog queries: product listings, product detail by slug,
/// and category browsing.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductListQuery {
    pub featured: Option<bool>,
    pub category_slug: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Lists products, optionally filtered to featured items or a
    /// category, newest first.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        query: ProductListQuery,
    ) -> Result<Vec<product::Model>, ServiceError> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query
            .per_page
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        let mut finder = Product::find();

        if let Some(featured) = query.featured {
            finder = finder.filter(product::Column::Featured.eq(featured));
        }

        if let Some(slug) = query.category_slug.as_deref() {
            let category = Category::find()
                .filter(category::Column::Slug.eq(slug))
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", slug)))?;
            finder = finder.filter(product::Column::CategoryId.eq(category.id));
        }

        let products = finder
            .order_by_desc(product::Column::CreatedAt)
            .offset((page - 1) * per_page)
            .limit(per_page)
            .all(&*self.db)
            .await?;

        Ok(products)
    }

    /// Substring search over product name, description, and category
    /// name. An empty query is rejected rather than returning the whole
    /// catalog.
    #[instrument(skip(self))]
    pub async fn search_products(&self, query: &str) -> Result<Vec<product::Model>, ServiceError> {
        let pattern = query.trim();
        if pattern.is_empty() {
            return Err(ServiceError::BadRequest(
                "Search query cannot be empty".to_string(),
            ));
        }

        let products = Product::find()
            .left_join(Category)
            .filter(
                Condition::any()
                    .add(product::Column::Name.contains(pattern))
                    .add(product::Column::Description.contains(pattern))
                    .add(category::Column::Name.contains(pattern)),
            )
            .order_by_desc(product::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(products)
    }

    /// Fetches a single product by its URL slug.
    #[instrument(skip(self))]
    pub async fn get_product_by_slug(&self, slug: &str) -> Result<product::Model, ServiceError> {
        Product::find()
            .filter(product::Column::Slug.eq(slug))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", slug)))
    }

    /// Lists all categories, alphabetically.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        let categories = Category::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?;
        Ok(categories)
    }

    /// Fetches a category by slug together with its products.
    #[instrument(skip(self))]
    pub async fn get_category_with_products(
        &self,
        slug: &str,
    ) -> Result<(category::Model, Vec<product::Model>), ServiceError> {
        let category = Category::find()
            .filter(category::Column::Slug.eq(slug))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", slug)))?;

        let products = Product::find()
            .filter(product::Column::CategoryId.eq(category.id))
            .order_by_desc(product::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok((category, products))
    }
}
