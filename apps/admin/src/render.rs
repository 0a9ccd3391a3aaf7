use std::fmt::Write as _;

use client_core::ImageResolver;
use shared::domain::{Order, OrderId, OrderStatus, StatusCounts};

pub fn render_summary(counts: &StatusCounts) -> String {
    format!(
        "Total Orders: {}  Pending: {}  Dispatched: {}  Completed: {}  Unset: {}",
        counts.total, counts.pending, counts.dispatch, counts.success, counts.unset
    )
}

/// Order table with the expanded order's details inlined under its row.
pub fn render_orders(
    orders: &[Order],
    expanded: Option<&OrderId>,
    images: &dyn ImageResolver,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<24} {:<24} {:<28} {:<10} {:>10} {:<10}",
        "ID", "Customer", "Address", "Date", "Total", "Status"
    );
    for order in orders {
        let _ = writeln!(
            out,
            "{:<24} {:<24} {:<28} {:<10} {:>10} {:<10}",
            order.id,
            clip(&order.customer_name(), 24),
            clip(&order.address, 28),
            order.display_date(),
            format!("${}", order.total),
            status_cell(order.status),
        );
        if expanded == Some(&order.id) {
            out.push_str(&render_details(order, images));
        }
    }
    out
}

pub fn render_details(order: &Order, images: &dyn ImageResolver) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "    Order Details");
    let _ = writeln!(out, "    Phone: {}", order.phone);
    let _ = writeln!(out, "    Email: {}", order.email);
    let _ = writeln!(out, "    City: {} {}", order.city, order.zip_code);
    if order.discount != 0.0 {
        let _ = writeln!(out, "    Discount: ${}", order.discount);
    }
    for item in &order.cart_items {
        match item.image.as_ref().and_then(|image| images.resolve(image)) {
            Some(url) => {
                let _ = writeln!(out, "    - {} <{url}>", item.product_name);
            }
            None => {
                let _ = writeln!(out, "    - {}", item.product_name);
            }
        }
    }
    out
}

fn status_cell(status: Option<OrderStatus>) -> &'static str {
    status.map(OrderStatus::label).unwrap_or("-")
}

fn clip(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut clipped: String = value.chars().take(width.saturating_sub(1)).collect();
    clipped.push('~');
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_core::{CdnImageResolver, NoImageResolver};
    use shared::domain::{CartItem, ImageRef};

    fn sample(id: &str, status: Option<OrderStatus>) -> Order {
        Order {
            id: OrderId::from(id),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            phone: "555-0100".into(),
            email: "ada@example.com".into(),
            address: "12 Analytical Way".into(),
            city: "London".into(),
            zip_code: "N1".into(),
            total: 50.0,
            discount: 0.0,
            order_date: "2025-02-10T09:30:00Z".into(),
            status,
            cart_items: vec![CartItem {
                product_name: "Chair".into(),
                image: Some(ImageRef("image-abc-40x40-png".into())),
            }],
        }
    }

    #[test]
    fn details_only_for_expanded_order() {
        let orders = vec![sample("o1", Some(OrderStatus::Success)), sample("o2", None)];
        let expanded = OrderId::from("o2");
        let table = render_orders(&orders, Some(&expanded), &NoImageResolver);

        assert_eq!(table.matches("Order Details").count(), 1);
        assert!(table.contains("Completed"));
        assert!(table.contains("2025-02-10"));
        let details_at = table.find("Order Details").expect("details");
        let o2_at = table.find("o2 ").expect("o2 row");
        assert!(details_at > o2_at);
    }

    #[test]
    fn details_link_resolved_images() {
        let resolver = CdnImageResolver::new("proj1", "production");
        let details = render_details(&sample("o1", None), &resolver);
        assert!(details.contains(
            "- Chair <https://cdn.sanity.io/images/proj1/production/abc-40x40.png>"
        ));
    }

    #[test]
    fn summary_lists_every_bucket() {
        let counts = StatusCounts {
            total: 3,
            pending: 1,
            dispatch: 1,
            success: 0,
            unset: 1,
        };
        assert_eq!(
            render_summary(&counts),
            "Total Orders: 3  Pending: 1  Dispatched: 1  Completed: 0  Unset: 1"
        );
    }

    #[test]
    fn long_cells_are_clipped() {
        assert_eq!(clip("abcdef", 4), "abc~");
        assert_eq!(clip("abc", 4), "abc");
    }
}
