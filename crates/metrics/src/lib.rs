pub mod domain;
pub mod endpoint;
pub mod inbound;
pub mod outgoing;
pub mod ring_buffer;
pub mod route;

pub use domain::{DomainMetrics, DomainSnapshot};
pub use endpoint::{EndpointMetrics, EndpointSnapshot};
pub use inbound::{InboundCollector, InboundSnapshot};
pub use outgoing::{OutgoingCollector, OutgoingSnapshot};
pub use ring_buffer::RingBuffer;
pub use route::{RouteMetrics, RouteSnapshot};
