use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "1.0.0",
        description = r#"
# Storefront API

Backend for a small online store: product catalog, anonymous carts,
reviews, wishlists, and hosted-checkout payment with webhook-driven
order fulfillment.

## Carts

Carts are anonymous and keyed by a client-generated `cart_code`. The
client keeps the code; the server creates the cart lazily on the first
item added.

## Checkout

`POST /api/v1/checkout/session` hands the cart to the payment provider
and returns the hosted payment URL. Orders are created only when the
provider confirms payment through the signed webhook, and each checkout
session fulfills at most one order regardless of webhook redelivery.

## Error Handling

Errors use a consistent JSON shape:

```json
{
  "error": "Not Found",
  "message": "Cart abc123 not found",
  "timestamp": "2026-01-01T00:00:00Z"
}
```
        "#
    ),
    paths(
        // Catalog
        crate::handlers::products::list_products,
        crate::handlers::products::search_products,
        crate::handlers::products::get_product,
        crate::handlers::products::list_categories,
        crate::handlers::products::get_category,

        // Carts
        crate::handlers::carts::add_item,
        crate::handlers::carts::get_cart,
        crate::handlers::carts::update_item_quantity,
        crate::handlers::carts::remove_item,

        // Reviews
        crate::handlers::reviews::add_review,
        crate::handlers::reviews::update_review,
        crate::handlers::reviews::delete_review,

        // Wishlist
        crate::handlers::wishlist::toggle_wishlist,
        crate::handlers::wishlist::list_wishlist,

        // Checkout
        crate::handlers::checkout::create_checkout_session,
        crate::handlers::webhooks::stripe_webhook,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::handlers::carts::AddItemRequest,
        crate::handlers::carts::UpdateQuantityRequest,
        crate::handlers::reviews::AddReviewRequest,
        crate::handlers::reviews::UpdateReviewRequest,
        crate::handlers::wishlist::ToggleWishlistRequest,
        crate::handlers::checkout::CreateSessionRequest,
        crate::handlers::checkout::CreateSessionResponse,
    )),
    tags(
        (name = "Catalog", description = "Product and category browsing"),
        (name = "Carts", description = "Anonymous cart management"),
        (name = "Reviews", description = "Product reviews"),
        (name = "Wishlist", description = "Customer wishlists"),
        (name = "Checkout", description = "Hosted checkout sessions"),
        (name = "Webhooks", description = "Payment provider callbacks"),
    )
)]
pub struct ApiDoc;

/// Swagger UI mounted at `/swagger-ui`, serving the OpenAPI document
/// at `/api-docs/openapi.json`.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
