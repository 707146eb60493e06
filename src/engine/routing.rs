//! Service routing: which department and counter serve a service, and which
//! services draw priority tickets.

use crate::models::Department;

/// Services that draw from the priority counter.
pub const PRIORITY_SERVICES: [&str; 2] = ["pedido de declaracao", "senhas prioritarias"];

/// Department and counter a ticket is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub department: Department,
    pub counter_number: u8,
}

impl Route {
    fn to(department: Department) -> Self {
        Self {
            department,
            counter_number: department.counter_number(),
        }
    }

    pub fn counter_name(&self) -> String {
        self.department.counter_name()
    }
}

/// Look up the route for a free-text service name.
pub fn route_for_service(service: &str) -> Route {
    match service.trim().to_lowercase().as_str() {
        "matricula" | "reconfirmacao" | "pedido de declaracao" => {
            Route::to(Department::SecretariaAcademica)
        }
        "tesouraria" => Route::to(Department::Contabilidade),
        _ => Route::to(Department::ApoioAoCliente),
    }
}

pub fn is_priority_service(service: &str) -> bool {
    let key = service.trim().to_lowercase();
    PRIORITY_SERVICES.contains(&key.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_table() {
        assert_eq!(
            route_for_service("Matricula").department,
            Department::SecretariaAcademica
        );
        assert_eq!(
            route_for_service("Pedido de declaracao").department,
            Department::SecretariaAcademica
        );
        let treasury = route_for_service(" tesouraria ");
        assert_eq!(treasury.department, Department::Contabilidade);
        assert_eq!(treasury.counter_number, 2);
        assert_eq!(treasury.counter_name(), "Balcao 2 - Contabilidade");
    }

    #[test]
    fn test_unknown_service_goes_to_generic_counter() {
        let route = route_for_service("Bolsa de estudo");
        assert_eq!(route.department, Department::ApoioAoCliente);
        assert_eq!(route.counter_number, 3);
    }

    #[test]
    fn test_priority_services() {
        assert!(is_priority_service("Pedido de declaracao"));
        assert!(is_priority_service("  SENHAS PRIORITARIAS "));
        assert!(!is_priority_service("Matricula"));
        assert!(!is_priority_service("pedido de declaracao urgente"));
    }
}
