use crate::{
    error::GatewayError,
    filter::{Flow, GatewayFilter, Next},
    Exchange,
};

/// Commits the staged upstream body once the rest of the chain has run.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteResponseFilter;

impl GatewayFilter for WriteResponseFilter {
    async fn filter(&self, _exchange: &mut Exchange, next: Next) -> Result<Flow, GatewayError> {
        Ok(next.then(|exchange: &mut Exchange| -> Result<(), GatewayError> {
            if exchange.response().is_committed() {
                return Ok(());
            }
            if let Some(body) = exchange.take_client_response() {
                let response = exchange.response_mut();
                response.set_body(body);
                response.commit();
            }
            Ok(())
        }))
    }
}
