pub mod clientes;
pub mod filiais;
pub mod metas;
pub mod nps;
pub mod pedidos;
pub mod produtos;
pub mod vendedores;
