//! Column definitions binding field positions to record fields.
//!
//! A [`ColumnDef`] is built with a getter/setter pair for one record field and
//! a converter chosen at build time. Adding it to a [`ColumnSchema`] erases the
//! value type, so the mapper only ever sees `Column<T>`.

use std::{any::type_name, collections::HashSet, fmt, str::FromStr};

use crate::{
    convert::{Converter, CsvValue, DefaultConverter, FormatContext, FormatProvider},
    error::{ConversionError, CsvError},
};

type Getter<T, V> = Box<dyn Fn(&T) -> &V + Send + Sync>;
type Setter<T, V> = Box<dyn Fn(&mut T, V) + Send + Sync>;
type DecodeFn<T> = Box<dyn Fn(&mut T, &str, &FormatContext<'_>) -> Result<(), ConversionError> + Send + Sync>;
type EncodeFn<T> = Box<dyn Fn(&T, &FormatContext<'_>) -> Result<String, ConversionError> + Send + Sync>;

/// Typed column definition, before it is added to a schema.
///
/// # Examples
///
/// ```
/// use tinyline_csv::core::schema::{ColumnDef, ColumnSchema};
///
/// #[derive(Default)]
/// struct City {
///     name: String,
///     population: u64,
/// }
///
/// let schema = ColumnSchema::new()
///     .column(ColumnDef::new("name", |c: &City| &c.name, |c, v| c.name = v))
///     .column(ColumnDef::new("population", |c: &City| &c.population, |c, v| c.population = v).format("9"));
///
/// assert_eq!(schema.len(), 2);
/// assert_eq!(schema.names().collect::<Vec<_>>(), ["name", "population"]);
/// ```
pub struct ColumnDef<T, V, C> {
    name: String,
    index: Option<usize>,
    format: Option<String>,
    provider: FormatProvider,
    converter: C,
    get: Getter<T, V>,
    set: Setter<T, V>,
}

impl<T, V> ColumnDef<T, V, V::Converter>
where
    V: CsvValue,
{
    /// Column using the registered converter of `V`.
    pub fn new(
        name: impl Into<String>,
        get: impl Fn(&T) -> &V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self {
        ColumnDef::with_converter(name, get, set, V::Converter::default())
    }
}

impl<T, V> ColumnDef<T, V, DefaultConverter<V>>
where
    V: FromStr + fmt::Display + 'static,
    V::Err: fmt::Display,
{
    /// Column for a type without a registered converter, using its
    /// `FromStr` and `Display` implementations.
    pub fn parsed(
        name: impl Into<String>,
        get: impl Fn(&T) -> &V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self {
        ColumnDef::with_converter(name, get, set, DefaultConverter::new())
    }
}

impl<T, V, C> ColumnDef<T, V, C>
where
    C: Converter<V>,
{
    pub fn with_converter(
        name: impl Into<String>,
        get: impl Fn(&T) -> &V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
        converter: C,
    ) -> Self {
        Self {
            name: name.into(),
            index: None,
            format: None,
            provider: FormatProvider::invariant(),
            converter,
            get: Box::new(get),
            set: Box::new(set),
        }
    }

    /// Field position on read. Defaults to the number of columns already in
    /// the schema when the column is added. Across a schema the indices must
    /// cover `0..len` exactly.
    pub fn index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn provider(mut self, provider: FormatProvider) -> Self {
        self.provider = provider;
        self
    }

    /// Replaces the registered converter with a custom one.
    pub fn converter<C2: Converter<V>>(self, converter: C2) -> ColumnDef<T, V, C2> {
        ColumnDef {
            name: self.name,
            index: self.index,
            format: self.format,
            provider: self.provider,
            converter,
            get: self.get,
            set: self.set,
        }
    }
}

impl<T, V, C> ColumnDef<T, V, C>
where
    T: 'static,
    V: 'static,
    C: Converter<V>,
{
    fn into_column(self, default_index: usize) -> Column<T> {
        let ColumnDef {
            name,
            index,
            format,
            provider,
            converter,
            get,
            set,
        } = self;
        let converter = std::sync::Arc::new(converter);
        let decoder = converter.clone();

        Column {
            index: index.unwrap_or(default_index),
            name,
            type_name: type_name::<V>(),
            format,
            provider,
            decode: Box::new(move |record: &mut T, text: &str, ctx: &FormatContext<'_>| {
                let value = decoder.decode(text, ctx)?;
                set(record, value);
                Ok(())
            }),
            encode: Box::new(move |record: &T, ctx: &FormatContext<'_>| {
                converter.encode(get(record), ctx)
            }),
        }
    }
}

/// A column of a schema, with its value type erased.
pub struct Column<T> {
    index: usize,
    name: String,
    type_name: &'static str,
    format: Option<String>,
    provider: FormatProvider,
    decode: DecodeFn<T>,
    encode: EncodeFn<T>,
}

impl<T> Column<T> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rust name of the column's value type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    pub fn provider(&self) -> &FormatProvider {
        &self.provider
    }

    fn context(&self) -> FormatContext<'_> {
        FormatContext::new(self.format.as_deref(), &self.provider)
    }

    /// Converts `text` and assigns it to the column's field of `record`.
    pub fn decode_into(&self, record: &mut T, text: &str) -> Result<(), ConversionError> {
        (self.decode)(record, text, &self.context())
    }

    /// Converts the column's field of `record` to text.
    pub fn encode_from(&self, record: &T) -> Result<String, ConversionError> {
        (self.encode)(record, &self.context())
    }
}

impl<T> fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("format", &self.format)
            .finish()
    }
}

/// Ordered set of columns of a record type.
///
/// Iteration follows declaration order, which is also the write order;
/// decoding visits columns by ascending index.
pub struct ColumnSchema<T> {
    columns: Vec<Column<T>>,
    decode_order: Vec<usize>,
}

impl<T> Default for ColumnSchema<T> {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            decode_order: Vec::new(),
        }
    }
}

impl<T: 'static> ColumnSchema<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column<V: 'static, C: Converter<V>>(mut self, def: ColumnDef<T, V, C>) -> Self {
        self.push(def);
        self
    }

    pub fn push<V: 'static, C: Converter<V>>(&mut self, def: ColumnDef<T, V, C>) {
        let column = def.into_column(self.columns.len());
        self.columns.push(column);

        let mut order: Vec<usize> = (0..self.columns.len()).collect();
        order.sort_by_key(|&position| self.columns[position].index);
        self.decode_order = order;
    }
}

impl<T> ColumnSchema<T> {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Columns in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Column<T>> {
        self.columns.iter()
    }

    /// Columns in ascending index order.
    pub fn by_index(&self) -> impl Iterator<Item = &Column<T>> {
        self.decode_order
            .iter()
            .map(move |&position| &self.columns[position])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Column::name)
    }

    /// Checks that the schema has columns and that their indices are exactly
    /// `0..len`, each used once.
    pub fn validate(&self) -> Result<(), CsvError> {
        if self.columns.is_empty() {
            return Err(CsvError::InvalidSchema("schema has no columns".to_string()));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.index) {
                return Err(CsvError::InvalidSchema(format!(
                    "column '{}' reuses index {}",
                    column.name, column.index
                )));
            }
        }
        let count = self.columns.len();
        if let Some(column) = self.columns.iter().find(|column| column.index >= count) {
            return Err(CsvError::InvalidSchema(format!(
                "column '{}' has index {} but the schema has {} columns",
                column.name, column.index, count
            )));
        }
        Ok(())
    }
}

impl<T> fmt::Debug for ColumnSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.columns.iter()).finish()
    }
}
