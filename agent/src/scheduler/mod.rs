pub mod adaptive;
