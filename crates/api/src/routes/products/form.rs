//! Multipart product form parsing.
//!
//! Text fields arrive as strings and are converted here; the optional
//! `imagen` part is kept as raw bytes for [`crate::services::media`].

use std::collections::HashMap;

use axum::extract::Multipart;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use davila_core::{MAX_STOCK, SupplierId};

use crate::error::{AppError, FieldErrors, Result};
use crate::models::product::{NewProduct, Product};
use crate::services::media;

/// Prices are `NUMERIC(10,2)`.
const MAX_PRICE_DIGITS: u32 = 8;

const REQUIRED: &str = "Este campo es requerido.";

/// An uploaded file part.
#[derive(Debug)]
pub struct Upload {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// The raw contents of a product form.
#[derive(Debug, Default)]
pub struct ProductForm {
    fields: HashMap<String, String>,
    pub imagen: Option<Upload>,
}

impl ProductForm {
    /// Drain a multipart body. Unknown parts are ignored; an empty
    /// `imagen` part counts as no upload.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Rejected` when the body is not valid multipart.
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(rejected)? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            if name == "imagen" {
                let file_name = field.file_name().map(str::to_owned);
                let bytes = field.bytes().await.map_err(rejected)?;
                if !bytes.is_empty() {
                    form.imagen = Some(Upload {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            } else {
                let value = field.text().await.map_err(rejected)?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    /// Reject an unusable `imagen` part before anything is written.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Media` for oversized or non-image uploads.
    pub fn check_image(&self) -> Result<()> {
        if let Some(upload) = &self.imagen {
            media::check_image(upload.file_name.as_deref(), upload.bytes.len())?;
        }
        Ok(())
    }

    #[cfg(test)]
    fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            fields: pairs
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            imagen: None,
        }
    }

    /// Build the full set of product fields.
    ///
    /// With `base` (partial update) omitted fields keep the stored values;
    /// without it every required field must be present.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` listing every invalid field.
    pub fn to_fields(&self, base: Option<&Product>) -> Result<NewProduct> {
        let mut p = Parser {
            form: self,
            errors: FieldErrors::new(),
            partial: base.is_some(),
        };

        let codigo = p.text("codigo", 20);
        let nombre_producto = p.text("nombre_producto", 200);
        let descripcion = p.optional_text("descripcion", usize::MAX);
        let proveedor_id = p.supplier("proveedor");
        let marca = p.text("marca", 100);
        let categoria = p.text("categoria", 100);
        let procedencia = p.optional_text("procedencia", 150);
        let precio_unitario = p.price("precio_unitario");
        let precio_mayoreo = p.optional_price("precio_mayoreo");
        let stock = p.stock("stock");
        let es_nuevo = p.flag("es_nuevo");
        let fecha_novedad = p.date("fecha_novedad");
        let es_destacado = p.flag("es_destacado");

        let errors = p.errors;
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        let merged = match base {
            Some(current) => NewProduct {
                codigo: codigo.unwrap_or_else(|| current.codigo.clone()),
                nombre_producto: nombre_producto
                    .unwrap_or_else(|| current.nombre_producto.clone()),
                descripcion: descripcion.unwrap_or_else(|| current.descripcion.clone()),
                proveedor_id: proveedor_id.unwrap_or(current.proveedor_id),
                marca: marca.unwrap_or_else(|| current.marca.clone()),
                categoria: categoria.unwrap_or_else(|| current.categoria.clone()),
                procedencia: procedencia.unwrap_or_else(|| current.procedencia.clone()),
                precio_unitario: precio_unitario.unwrap_or(current.precio_unitario),
                precio_mayoreo: precio_mayoreo.unwrap_or(current.precio_mayoreo),
                stock: stock.unwrap_or(current.stock),
                es_nuevo: es_nuevo.unwrap_or(current.es_nuevo),
                fecha_novedad: fecha_novedad.unwrap_or(current.fecha_novedad),
                es_destacado: es_destacado.unwrap_or(current.es_destacado),
            },
            None => {
                // Required fields were checked by the parser.
                let (
                    Some(codigo),
                    Some(nombre_producto),
                    Some(proveedor_id),
                    Some(marca),
                    Some(categoria),
                    Some(precio_unitario),
                ) = (
                    codigo,
                    nombre_producto,
                    proveedor_id,
                    marca,
                    categoria,
                    precio_unitario,
                )
                else {
                    return Err(AppError::Internal("required product field missing".into()));
                };
                NewProduct {
                    codigo,
                    nombre_producto,
                    descripcion: descripcion.flatten(),
                    proveedor_id,
                    marca,
                    categoria,
                    procedencia: procedencia.flatten(),
                    precio_unitario,
                    precio_mayoreo: precio_mayoreo.flatten(),
                    stock: stock.unwrap_or(0),
                    es_nuevo: es_nuevo.unwrap_or(false),
                    fecha_novedad: fecha_novedad.flatten(),
                    es_destacado: es_destacado.unwrap_or(false),
                }
            }
        };
        Ok(merged)
    }
}

fn rejected(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Rejected(format!("Formulario inválido: {}", e.body_text()))
}

/// Field-by-field conversion. Every getter returns `None` when the field is
/// absent (recording "required" unless the update is partial) or invalid
/// (recording the reason).
struct Parser<'a> {
    form: &'a ProductForm,
    errors: FieldErrors,
    partial: bool,
}

impl<'a> Parser<'a> {
    fn raw(&self, name: &str) -> Option<&'a str> {
        self.form.fields.get(name).map(|v| v.trim())
    }

    fn missing(&mut self, name: &str) {
        if !self.partial {
            self.errors.add(name, REQUIRED);
        }
    }

    fn text(&mut self, name: &str, max: usize) -> Option<String> {
        match self.raw(name) {
            None | Some("") => {
                if self.raw(name).is_some() {
                    self.errors.add(name, "Este campo no puede estar en blanco.");
                } else {
                    self.missing(name);
                }
                None
            }
            Some(value) if value.chars().count() > max => {
                self.errors.add(
                    name,
                    format!("Asegúrese de que este campo no tenga más de {max} caracteres."),
                );
                None
            }
            Some(value) => Some(value.to_owned()),
        }
    }

    /// `Some(None)` clears the field; `None` leaves it untouched.
    fn optional_text(&mut self, name: &str, max: usize) -> Option<Option<String>> {
        match self.raw(name)? {
            "" => Some(None),
            value if value.chars().count() > max => {
                self.errors.add(
                    name,
                    format!("Asegúrese de que este campo no tenga más de {max} caracteres."),
                );
                None
            }
            value => Some(Some(value.to_owned())),
        }
    }

    fn supplier(&mut self, name: &str) -> Option<SupplierId> {
        let Some(raw) = self.raw(name).filter(|v| !v.is_empty()) else {
            self.missing(name);
            return None;
        };
        match raw.parse::<i32>() {
            Ok(id) => Some(SupplierId::new(id)),
            Err(_) => {
                self.errors.add(name, "Se requiere un identificador de proveedor válido.");
                None
            }
        }
    }

    fn price(&mut self, name: &str) -> Option<Decimal> {
        let Some(raw) = self.raw(name).filter(|v| !v.is_empty()) else {
            self.missing(name);
            return None;
        };
        self.decimal(name, raw)
    }

    fn optional_price(&mut self, name: &str) -> Option<Option<Decimal>> {
        match self.raw(name)? {
            "" => Some(None),
            raw => self.decimal(name, raw).map(Some),
        }
    }

    fn decimal(&mut self, name: &str, raw: &str) -> Option<Decimal> {
        let Ok(value) = raw.parse::<Decimal>() else {
            self.errors.add(name, "Se requiere un número válido.");
            return None;
        };
        if value.is_sign_negative() && !value.is_zero() {
            self.errors
                .add(name, "Asegúrese de que este valor sea mayor o igual a 0.");
            return None;
        }
        if value.scale() > 2 {
            self.errors
                .add(name, "Asegúrese de que no haya más de 2 decimales.");
            return None;
        }
        if value.trunc() >= Decimal::from(10_u64.pow(MAX_PRICE_DIGITS)) {
            self.errors
                .add(name, "Asegúrese de que no haya más de 10 dígitos en total.");
            return None;
        }
        Some(value)
    }

    fn stock(&mut self, name: &str) -> Option<i32> {
        let raw = self.raw(name).filter(|v| !v.is_empty())?;
        match raw.parse::<i32>() {
            Ok(n) if (0..=MAX_STOCK).contains(&n) => Some(n),
            Ok(_) => {
                self.errors.add(
                    name,
                    format!("El stock debe estar entre 0 y {MAX_STOCK}."),
                );
                None
            }
            Err(_) => {
                self.errors.add(name, "Introduzca un número entero válido.");
                None
            }
        }
    }

    fn flag(&mut self, name: &str) -> Option<bool> {
        match self.raw(name)?.to_ascii_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => Some(true),
            "false" | "0" | "off" | "no" | "" => Some(false),
            _ => {
                self.errors.add(name, "Debe ser un valor booleano válido.");
                None
            }
        }
    }

    /// RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC).
    fn date(&mut self, name: &str) -> Option<Option<DateTime<Utc>>> {
        let raw = self.raw(name)?;
        if raw.is_empty() {
            return Some(None);
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(Some(ts.with_timezone(&Utc)));
        }
        if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Some(Some(midnight.and_utc()));
        }
        self.errors.add(
            name,
            "Formato de fecha inválido. Use AAAA-MM-DD o una fecha ISO 8601.",
        );
        None
    }
}
