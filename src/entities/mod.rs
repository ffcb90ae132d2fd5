/// Persistence entities
pub mod cart;
pub mod cart_item;
pub mod category;
pub mod customer;
pub mod order;
pub mod order_item;
pub mod product;
pub mod review;
pub mod wishlist;

// Re-export entities
pub use cart::{Entity as Cart, Model as CartModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use category::{Entity as Category, Model as CategoryModel};
pub use customer::{Entity as Customer, Model as CustomerModel};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use product::{Entity as Product, Model as ProductModel};
pub use review::{Entity as Review, Model as ReviewModel};
pub use wishlist::{Entity as Wishlist, Model as WishlistModel};
