use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::inventory::list_inventory,
        crate::handlers::inventory::create_inventory,
        crate::handlers::inventory::get_inventory,
        crate::handlers::inventory::update_inventory,
        crate::handlers::inventory::get_by_product,
        crate::handlers::inventory::adjust_stock,
        crate::handlers::inventory::add_stock,
        crate::handlers::inventory::remove_stock,
        crate::handlers::inventory::check_stock,
        crate::handlers::inventory::reserve_stock,
        crate::handlers::inventory::list_movements,
        crate::handlers::inventory::product_movements,
        crate::handlers::inventory::inventory_stats,
        crate::handlers::inventory::low_stock_alert,
        crate::handlers::inventory::out_of_stock,
        crate::handlers::sales::create_sale,
        crate::handlers::sales::get_sale,
        crate::handlers::sales::list_sales,
        crate::handlers::sales::update_sale,
        crate::handlers::sales::cancel_sale,
        crate::handlers::sales::update_sale_status,
        crate::handlers::sales::add_item,
        crate::handlers::sales::update_item,
        crate::handlers::sales::remove_item,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::entities::sale::SaleStatus,
        crate::entities::inventory_movement::MovementType,
        crate::services::inventory::CreateInventoryRequest,
        crate::services::inventory::InventoryResponse,
        crate::services::inventory::MovementResponse,
        crate::services::inventory::StockCheckResponse,
        crate::services::sales::CreateSaleRequest,
        crate::services::sales::SaleItemRequest,
        crate::services::sales::UpdateSaleRequest,
        crate::services::sales::AddSaleItemRequest,
        crate::services::sales::UpdateSaleItemRequest,
        crate::services::sales::SaleResponse,
        crate::services::sales::SaleItemResponse,
        crate::handlers::inventory::AdjustStockBody,
        crate::handlers::inventory::StockMovementBody,
        crate::handlers::inventory::UpdateInventoryBody,
        crate::handlers::sales::UpdateSaleStatusBody,
    )),
    tags(
        (name = "inventory", description = "Stock records, movements and availability"),
        (name = "sales", description = "Sale lifecycle and line items"),
    ),
    info(
        title = "Mercantil API",
        description = "Back-office API for retail/wholesale operations",
    )
)]
pub struct ApiDoc;

/// Swagger UI router, mounted at `/docs`.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
